//! Directory-backed lock shared between processes
//!
//! Each key maps to `<sha256(key)>.lock` holding the holder token and lease
//! expiry. A lock file is published by hard-linking a fully written temp
//! file into place, so creation is atomic set-if-absent and nobody ever
//! reads a partial record.
//!
//! Removing a lock file (release, or breaking an expired lease) requires
//! the key's breaker, `<sha256(key)>.break`, created with `create_new`.
//! Publishing only ever fills an empty path and only breaker holders empty
//! it, so a record read while holding the breaker stays in place until its
//! holder removes it. A breaker left behind by a crashed process is
//! reclaimed once it is older than [`BREAKER_STALE`].

use super::{Lock, LockManager};
use crate::error::{SwatchError, SwatchResult};
use crate::keys::file_stem;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

/// Attempts per `try_acquire` or `release` call
const ACQUIRE_ATTEMPTS: usize = 3;

/// Age after which a breaker is presumed abandoned
///
/// Breakers are held for a read and an unlink, far below this.
const BREAKER_STALE: Duration = Duration::from_secs(2);

/// Pause before retrying a release whose breaker is taken
const BREAKER_RETRY: Duration = Duration::from_millis(5);

/// Outcome of trying to remove a lock file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Eviction {
    /// The expected record was removed
    Removed,
    /// The path no longer holds the expected record; nothing was touched
    Changed,
    /// Another process holds the breaker
    Busy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct LockRecord {
    key: String,
    holder: String,
    expires_at: DateTime<Utc>,
}

impl LockRecord {
    fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Lock table stored as files in a shared directory
#[derive(Debug, Clone)]
pub struct FileLockManager {
    dir: PathBuf,
}

impl FileLockManager {
    /// Open (creating if needed) a lock directory
    pub async fn new(dir: impl Into<PathBuf>) -> SwatchResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| SwatchError::io(format!("creating lock dir {}", dir.display()), e))?;
        Ok(Self { dir })
    }

    /// Directory holding the lock files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether `key` currently has a live lease
    pub async fn is_held(&self, key: &str) -> SwatchResult<bool> {
        Ok(self
            .read_record(&self.lock_path(key))
            .await?
            .is_some_and(|r| !r.is_expired()))
    }

    fn lock_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.lock", file_stem(key)))
    }

    fn scratch_path(&self, key: &str, suffix: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}.{}", file_stem(key), Uuid::new_v4(), suffix))
    }

    async fn read_record(&self, path: &Path) -> SwatchResult<Option<LockRecord>> {
        match fs::read_to_string(path).await {
            Ok(content) => serde_json::from_str(&content).map(Some).map_err(|e| {
                SwatchError::LockBackend(format!("parsing {}: {}", path.display(), e))
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SwatchError::LockBackend(format!(
                "reading {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Publish `record` at `path` unless a lock file already exists
    async fn publish(&self, path: &Path, record: &LockRecord) -> SwatchResult<bool> {
        let tmp = self.scratch_path(&record.key, "tmp");
        let content = serde_json::to_string(record)?;

        fs::write(&tmp, content)
            .await
            .map_err(|e| SwatchError::LockBackend(format!("writing {}: {}", tmp.display(), e)))?;

        let linked = fs::hard_link(&tmp, path).await;
        let _ = fs::remove_file(&tmp).await;

        match linked {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(SwatchError::LockBackend(format!(
                "creating {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn breaker_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.break", file_stem(key)))
    }

    /// Take the key's breaker, reclaiming an abandoned one
    async fn take_breaker(&self, key: &str) -> SwatchResult<Option<PathBuf>> {
        let path = self.breaker_path(key);

        for _ in 0..2 {
            let created = fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;

            match created {
                Ok(_) => return Ok(Some(path)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if !breaker_is_stale(&path).await {
                        return Ok(None);
                    }
                    warn!("Reclaiming abandoned lock breaker {}", path.display());
                    match fs::remove_file(&path).await {
                        Ok(()) => {}
                        Err(e) if e.kind() == ErrorKind::NotFound => {}
                        Err(e) => {
                            return Err(SwatchError::LockBackend(format!(
                                "removing {}: {}",
                                path.display(),
                                e
                            )))
                        }
                    }
                }
                Err(e) => {
                    return Err(SwatchError::LockBackend(format!(
                        "creating {}: {}",
                        path.display(),
                        e
                    )))
                }
            }
        }

        Ok(None)
    }

    /// Remove the lock file at `path` only if it still holds `expected`
    async fn evict(&self, path: &Path, expected: &LockRecord) -> SwatchResult<Eviction> {
        let Some(breaker) = self.take_breaker(&expected.key).await? else {
            return Ok(Eviction::Busy);
        };

        let result = self.evict_holding_breaker(path, expected).await;

        if let Err(e) = fs::remove_file(&breaker).await {
            warn!("Could not drop lock breaker {}: {}", breaker.display(), e);
        }
        result
    }

    async fn evict_holding_breaker(
        &self,
        path: &Path,
        expected: &LockRecord,
    ) -> SwatchResult<Eviction> {
        if self.read_record(path).await?.as_ref() != Some(expected) {
            return Ok(Eviction::Changed);
        }

        match fs::remove_file(path).await {
            Ok(()) => Ok(Eviction::Removed),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Eviction::Changed),
            Err(e) => Err(SwatchError::LockBackend(format!(
                "removing {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

/// Whether the breaker at `path` is old enough to be abandoned
///
/// A breaker that vanished in the meantime counts as stale so the caller
/// retries creating it.
async fn breaker_is_stale(path: &Path) -> bool {
    match fs::metadata(path).await.and_then(|m| m.modified()) {
        Ok(modified) => {
            SystemTime::now()
                .duration_since(modified)
                .unwrap_or_default()
                >= BREAKER_STALE
        }
        Err(e) => e.kind() == ErrorKind::NotFound,
    }
}

#[async_trait]
impl LockManager for FileLockManager {
    async fn try_acquire(&self, key: &str, holder: &str, ttl: Duration) -> SwatchResult<bool> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| SwatchError::LockBackend(format!("ttl out of range: {}", e)))?;
        let path = self.lock_path(key);

        for _ in 0..ACQUIRE_ATTEMPTS {
            let record = LockRecord {
                key: key.to_string(),
                holder: holder.to_string(),
                expires_at: Utc::now() + ttl,
            };

            if self.publish(&path, &record).await? {
                return Ok(true);
            }

            let Some(current) = self.read_record(&path).await? else {
                // Released between our attempt and the read
                continue;
            };

            if current.holder == holder {
                // Refresh our own lease
                if self.evict(&path, &current).await? == Eviction::Removed
                    && self.publish(&path, &record).await?
                {
                    return Ok(true);
                }
                continue;
            }

            if !current.is_expired() {
                return Ok(false);
            }

            debug!(
                "Breaking expired lock {} held by {}",
                key, current.holder
            );
            self.evict(&path, &current).await?;
        }

        Ok(false)
    }

    async fn release(&self, lock: &Lock) -> SwatchResult<()> {
        let path = self.lock_path(&lock.key);

        for _ in 0..ACQUIRE_ATTEMPTS {
            let Some(current) = self.read_record(&path).await? else {
                return Ok(());
            };

            if current.holder != lock.holder {
                if current.is_expired() {
                    return Ok(());
                }
                return Err(SwatchError::LockOwnershipMismatch {
                    key: lock.key.clone(),
                });
            }

            match self.evict(&path, &current).await? {
                Eviction::Removed => return Ok(()),
                // Re-read: either gone or someone else's now
                Eviction::Changed => {}
                Eviction::Busy => tokio::time::sleep(BREAKER_RETRY).await,
            }
        }

        Err(SwatchError::LockBackend(format!(
            "breaker for {} stayed busy",
            lock.key
        )))
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock::AcquireOptions;
    use tempfile::TempDir;

    async fn test_manager() -> (FileLockManager, TempDir) {
        let temp = TempDir::new().unwrap();
        let manager = FileLockManager::new(temp.path().join("locks")).await.unwrap();
        (manager, temp)
    }

    fn lock(key: &str, holder: &str) -> Lock {
        Lock {
            key: key.to_string(),
            holder: holder.to_string(),
            ttl: Duration::from_secs(5),
        }
    }

    fn lock_files(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect()
    }

    #[tokio::test]
    async fn set_if_absent() {
        let (manager, _temp) = test_manager().await;
        let ttl = Duration::from_secs(5);

        assert!(manager.try_acquire("k", "a", ttl).await.unwrap());
        assert!(!manager.try_acquire("k", "b", ttl).await.unwrap());
        assert!(manager.is_held("k").await.unwrap());
    }

    #[tokio::test]
    async fn same_holder_refreshes() {
        let (manager, _temp) = test_manager().await;
        let ttl = Duration::from_secs(5);

        assert!(manager.try_acquire("k", "a", ttl).await.unwrap());
        assert!(manager.try_acquire("k", "a", ttl).await.unwrap());
        assert_eq!(lock_files(manager.dir()).len(), 1);
    }

    #[tokio::test]
    async fn release_frees_and_leaves_no_files() {
        let (manager, _temp) = test_manager().await;
        manager
            .try_acquire("k", "a", Duration::from_secs(5))
            .await
            .unwrap();

        manager.release(&lock("k", "a")).await.unwrap();
        manager.release(&lock("k", "a")).await.unwrap();

        assert!(!manager.is_held("k").await.unwrap());
        assert!(lock_files(manager.dir()).is_empty());
    }

    #[tokio::test]
    async fn release_by_other_holder_is_rejected() {
        let (manager, _temp) = test_manager().await;
        manager
            .try_acquire("k", "a", Duration::from_secs(5))
            .await
            .unwrap();

        let err = manager.release(&lock("k", "b")).await.unwrap_err();
        assert!(matches!(err, SwatchError::LockOwnershipMismatch { .. }));
        assert!(manager.is_held("k").await.unwrap());
    }

    #[tokio::test]
    async fn expired_lease_is_broken() {
        let (manager, _temp) = test_manager().await;
        assert!(manager
            .try_acquire("k", "crashed", Duration::ZERO)
            .await
            .unwrap());

        assert!(manager
            .try_acquire("k", "b", Duration::from_secs(5))
            .await
            .unwrap());

        let err = manager.release(&lock("k", "crashed")).await.unwrap_err();
        assert!(matches!(err, SwatchError::LockOwnershipMismatch { .. }));
        manager.release(&lock("k", "b")).await.unwrap();
    }

    #[tokio::test]
    async fn handles_on_same_dir_exclude_each_other() {
        let (first, _temp) = test_manager().await;
        let second = FileLockManager::new(first.dir().to_path_buf()).await.unwrap();
        let options = AcquireOptions {
            ttl: Duration::from_secs(5),
            max_wait: Duration::from_millis(50),
            retry_interval: Duration::from_millis(10),
        };

        let held = first.acquire("k", "a", options).await.unwrap();
        let err = second.acquire("k", "b", options).await.unwrap_err();
        assert!(matches!(err, SwatchError::LockTimeout { .. }));

        first.release(&held).await.unwrap();
        second.acquire("k", "b", options).await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn contended_acquire_has_single_winner() {
        let (manager, _temp) = test_manager().await;
        let manager = std::sync::Arc::new(manager);

        let mut tasks = vec![];
        for i in 0..16 {
            let manager = manager.clone();
            tasks.push(tokio::spawn(async move {
                manager
                    .try_acquire("k", &format!("holder-{i}"), Duration::from_secs(5))
                    .await
                    .unwrap()
            }));
        }

        let mut winners = 0;
        for task in tasks {
            if task.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn stale_view_cannot_remove_a_fresh_lease() {
        let (a, _temp) = test_manager().await;
        let b = FileLockManager::new(a.dir().to_path_buf()).await.unwrap();
        let c = FileLockManager::new(a.dir().to_path_buf()).await.unwrap();
        let path = a.lock_path("k");

        assert!(a.try_acquire("k", "crashed", Duration::ZERO).await.unwrap());
        let expired = a.read_record(&path).await.unwrap().unwrap();

        // b breaks the expired lease and takes the key before a acts on its read
        assert!(b.try_acquire("k", "b", Duration::from_secs(5)).await.unwrap());

        assert_eq!(a.evict(&path, &expired).await.unwrap(), Eviction::Changed);
        assert!(!c.try_acquire("k", "c", Duration::from_secs(5)).await.unwrap());
        assert_eq!(a.read_record(&path).await.unwrap().unwrap().holder, "b");

        b.release(&lock("k", "b")).await.unwrap();
        assert!(lock_files(a.dir()).is_empty());
    }

    #[tokio::test]
    async fn busy_breaker_defers_removal() {
        let (manager, _temp) = test_manager().await;
        assert!(manager
            .try_acquire("k", "a", Duration::from_secs(5))
            .await
            .unwrap());
        std::fs::write(manager.breaker_path("k"), b"").unwrap();

        let current = manager
            .read_record(&manager.lock_path("k"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            manager.evict(&manager.lock_path("k"), &current).await.unwrap(),
            Eviction::Busy
        );

        let err = manager.release(&lock("k", "a")).await.unwrap_err();
        assert!(matches!(err, SwatchError::LockBackend(_)));
        assert!(manager.is_held("k").await.unwrap());

        std::fs::remove_file(manager.breaker_path("k")).unwrap();
        manager.release(&lock("k", "a")).await.unwrap();
        assert!(!manager.is_held("k").await.unwrap());
    }

    #[tokio::test]
    async fn abandoned_breaker_is_reclaimed() {
        let (manager, _temp) = test_manager().await;
        assert!(manager
            .try_acquire("k", "crashed", Duration::ZERO)
            .await
            .unwrap());

        let breaker = std::fs::File::create(manager.breaker_path("k")).unwrap();
        breaker
            .set_modified(SystemTime::now() - BREAKER_STALE - Duration::from_secs(1))
            .unwrap();
        drop(breaker);

        assert!(manager
            .try_acquire("k", "b", Duration::from_secs(5))
            .await
            .unwrap());
        assert!(!manager.breaker_path("k").exists());
    }
}
