//! Cross-process mutual exclusion keyed by string
//!
//! A lock is a named reservation owned by a holder token with a TTL. The TTL
//! bounds how long a crashed holder can block everyone else; explicit
//! release frees the key as soon as the critical section ends.
//!
//! Backends only implement the atomic primitive ([`LockManager::try_acquire`])
//! and release. The bounded-wait retry loop is shared, and [`LockGuard`]
//! provides scoped acquisition: release runs on every exit path, including
//! errors and cancelled futures.

mod file;
mod memory;

pub use file::FileLockManager;
pub use memory::MemoryLockManager;

use crate::error::{SwatchError, SwatchResult};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Floor on the pause between acquisition attempts
const MIN_RETRY_INTERVAL: Duration = Duration::from_millis(1);

/// A held lock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lock {
    /// Lock key
    pub key: String,
    /// Token identifying the owner
    pub holder: String,
    /// Lifetime after which the backend frees the key on its own
    pub ttl: Duration,
}

/// How long to hold and how long to wait for a lock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquireOptions {
    /// Lease duration
    pub ttl: Duration,
    /// Total time budget for acquisition
    pub max_wait: Duration,
    /// Pause between attempts
    pub retry_interval: Duration,
}

impl Default for AcquireOptions {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(5),
            max_wait: Duration::from_millis(200),
            retry_interval: Duration::from_millis(25),
        }
    }
}

/// Abstract lock backend
#[async_trait]
pub trait LockManager: Send + Sync {
    /// Atomically take `key` for `holder` if it is free or its lease expired
    ///
    /// Returns `false` when another holder has a live lease. Taking a key
    /// already held by the same holder refreshes the lease.
    async fn try_acquire(&self, key: &str, holder: &str, ttl: Duration) -> SwatchResult<bool>;

    /// Release a lock
    ///
    /// Idempotent: releasing an absent or expired lock succeeds. If the key
    /// is now held by someone else, their lock is left alone and
    /// [`SwatchError::LockOwnershipMismatch`] is returned.
    async fn release(&self, lock: &Lock) -> SwatchResult<()>;

    /// Human-readable backend name for display
    fn backend_name(&self) -> &'static str;

    /// Acquire `key`, retrying until `options.max_wait` runs out
    ///
    /// At least one attempt is always made. Fails with
    /// [`SwatchError::LockTimeout`] when the budget is exhausted.
    async fn acquire(
        &self,
        key: &str,
        holder: &str,
        options: AcquireOptions,
    ) -> SwatchResult<Lock> {
        let started = Instant::now();
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            if self.try_acquire(key, holder, options.ttl).await? {
                debug!("Acquired lock {} after {} attempt(s)", key, attempts);
                return Ok(Lock {
                    key: key.to_string(),
                    holder: holder.to_string(),
                    ttl: options.ttl,
                });
            }

            let elapsed = started.elapsed();
            if elapsed >= options.max_wait {
                return Err(SwatchError::LockTimeout {
                    key: key.to_string(),
                    waited_ms: elapsed.as_millis() as u64,
                });
            }

            let pause = options
                .retry_interval
                .min(options.max_wait - elapsed)
                .max(MIN_RETRY_INTERVAL);
            tokio::time::sleep(pause).await;
        }
    }
}

/// Scoped lock ownership
///
/// Call [`LockGuard::release`] at the end of the critical section. If the
/// guard is dropped instead (early return, panic, or the owning future being
/// cancelled) the release is spawned onto the current runtime. The lease TTL
/// covers the case where no runtime is left to run it.
pub struct LockGuard {
    manager: Arc<dyn LockManager>,
    lock: Option<Lock>,
    deadline: Instant,
}

impl LockGuard {
    /// Acquire a lock and take scoped ownership of it
    pub async fn acquire(
        manager: Arc<dyn LockManager>,
        key: &str,
        holder: &str,
        options: AcquireOptions,
    ) -> SwatchResult<Self> {
        // The lease starts at the winning attempt, never before this point
        let requested = Instant::now();
        let lock = manager.acquire(key, holder, options).await?;
        Ok(Self {
            manager,
            lock: Some(lock),
            deadline: requested + options.ttl,
        })
    }

    /// Key of the held lock
    pub fn key(&self) -> &str {
        self.lock.as_ref().map(|l| l.key.as_str()).unwrap_or_default()
    }

    /// Instant by which the lease has certainly expired
    ///
    /// Work that must stay exclusive has to finish before this.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Run `work` while the lease is still ours
    ///
    /// Fails with [`SwatchError::LeaseExpired`] if the deadline passes first;
    /// `work` is dropped at that point, so none of its later steps run.
    pub async fn run_within_lease<F, T>(&self, work: F) -> SwatchResult<T>
    where
        F: std::future::Future<Output = SwatchResult<T>>,
    {
        match tokio::time::timeout_at(self.deadline, work).await {
            Ok(result) => result,
            Err(_) => {
                let (key, ttl) = self
                    .lock
                    .as_ref()
                    .map(|l| (l.key.clone(), l.ttl))
                    .unwrap_or_default();
                warn!("Lease on {} ran out inside the critical section", key);
                Err(SwatchError::LeaseExpired {
                    key,
                    ttl_ms: ttl.as_millis() as u64,
                })
            }
        }
    }

    /// Release now
    pub async fn release(mut self) {
        if let Some(lock) = self.lock.take() {
            release_logged(self.manager.as_ref(), &lock).await;
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let Some(lock) = self.lock.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let manager = Arc::clone(&self.manager);
                handle.spawn(async move {
                    release_logged(manager.as_ref(), &lock).await;
                });
            }
            Err(_) => warn!(
                "No runtime to release lock {}; it expires within {:?}",
                lock.key, lock.ttl
            ),
        }
    }
}

impl std::fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard")
            .field("backend", &self.manager.backend_name())
            .field("lock", &self.lock)
            .field("deadline", &self.deadline)
            .finish()
    }
}

async fn release_logged(manager: &dyn LockManager, lock: &Lock) {
    match manager.release(lock).await {
        Ok(()) => debug!("Released lock {}", lock.key),
        Err(e) => warn!("Failed to release lock {}: {}", lock.key, e),
    }
}
