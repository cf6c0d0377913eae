//! In-process lock backend

use super::{Lock, LockManager};
use crate::error::{SwatchError, SwatchResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug)]
struct Lease {
    holder: String,
    expires_at: Instant,
}

impl Lease {
    fn is_live(&self) -> bool {
        self.expires_at > Instant::now()
    }
}

/// Lock table held in process memory
///
/// Only excludes callers sharing this instance; use a shared backend when
/// several processes mint against the same store.
#[derive(Debug, Default)]
pub struct MemoryLockManager {
    leases: Mutex<HashMap<String, Lease>>,
}

impl MemoryLockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` currently has a live lease
    pub async fn is_held(&self, key: &str) -> bool {
        self.leases
            .lock()
            .await
            .get(key)
            .is_some_and(Lease::is_live)
    }
}

#[async_trait]
impl LockManager for MemoryLockManager {
    async fn try_acquire(&self, key: &str, holder: &str, ttl: Duration) -> SwatchResult<bool> {
        let mut leases = self.leases.lock().await;

        if let Some(lease) = leases.get(key) {
            if lease.is_live() && lease.holder != holder {
                return Ok(false);
            }
        }

        leases.insert(
            key.to_string(),
            Lease {
                holder: holder.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(true)
    }

    async fn release(&self, lock: &Lock) -> SwatchResult<()> {
        let mut leases = self.leases.lock().await;

        match leases.get(&lock.key) {
            None => Ok(()),
            Some(lease) if lease.holder == lock.holder || !lease.is_live() => {
                leases.remove(&lock.key);
                Ok(())
            }
            Some(_) => Err(SwatchError::LockOwnershipMismatch {
                key: lock.key.clone(),
            }),
        }
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lock(key: &str, holder: &str) -> Lock {
        Lock {
            key: key.to_string(),
            holder: holder.to_string(),
            ttl: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn set_if_absent() {
        let manager = MemoryLockManager::new();
        let ttl = Duration::from_secs(5);

        assert!(manager.try_acquire("k", "a", ttl).await.unwrap());
        assert!(!manager.try_acquire("k", "b", ttl).await.unwrap());
        assert!(manager.try_acquire("k", "a", ttl).await.unwrap());
    }

    #[tokio::test]
    async fn release_is_idempotent() {
        let manager = MemoryLockManager::new();
        manager
            .try_acquire("k", "a", Duration::from_secs(5))
            .await
            .unwrap();

        manager.release(&lock("k", "a")).await.unwrap();
        manager.release(&lock("k", "a")).await.unwrap();
        manager.release(&lock("never-held", "a")).await.unwrap();
        assert!(!manager.is_held("k").await);
    }

    #[tokio::test]
    async fn release_by_other_holder_is_rejected() {
        let manager = MemoryLockManager::new();
        manager
            .try_acquire("k", "a", Duration::from_secs(5))
            .await
            .unwrap();

        let err = manager.release(&lock("k", "b")).await.unwrap_err();
        assert!(matches!(err, SwatchError::LockOwnershipMismatch { .. }));
        assert!(manager.is_held("k").await);
    }

    #[tokio::test(start_paused = true)]
    async fn late_release_does_not_free_new_holder() {
        let manager = MemoryLockManager::new();
        manager
            .try_acquire("k", "slow", Duration::from_millis(100))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_millis(150)).await;
        assert!(manager
            .try_acquire("k", "next", Duration::from_secs(5))
            .await
            .unwrap());

        assert!(manager.release(&lock("k", "slow")).await.is_err());
        assert!(manager.is_held("k").await);
    }
}
