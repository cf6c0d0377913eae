//! Backend factory
//!
//! Builds the cache, lock and content-store implementations named in the
//! configuration and wires them into a [`Minter`].

use crate::cache::{Cache, FileCache, MemoryCache};
use crate::config::schema::{SharedBackend, StoreBackend};
use crate::config::{Config, ConfigManager};
use crate::error::SwatchResult;
use crate::ledger::Ledger;
use crate::lock::{FileLockManager, LockManager, MemoryLockManager};
use crate::mint::Minter;
use crate::store::{ContentStore, IpfsContentStore, LocalContentStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Directory backing the file cache
pub fn cache_dir(config: &Config) -> PathBuf {
    config
        .cache
        .dir
        .clone()
        .unwrap_or_else(ConfigManager::cache_dir)
}

/// Directory backing the file lock manager
pub fn locks_dir(config: &Config) -> PathBuf {
    config
        .lock
        .dir
        .clone()
        .unwrap_or_else(ConfigManager::locks_dir)
}

/// Root of the local content store
pub fn store_dir(config: &Config) -> PathBuf {
    config
        .store
        .dir
        .clone()
        .unwrap_or_else(ConfigManager::store_dir)
}

/// Create the configured cache backend
pub async fn create_cache(config: &Config) -> SwatchResult<Arc<dyn Cache>> {
    match config.cache.backend {
        SharedBackend::File => Ok(Arc::new(FileCache::new(cache_dir(config)).await?)),
        SharedBackend::Memory => Ok(Arc::new(MemoryCache::new())),
    }
}

/// Create the configured lock backend
pub async fn create_lock_manager(config: &Config) -> SwatchResult<Arc<dyn LockManager>> {
    match config.lock.backend {
        SharedBackend::File => Ok(Arc::new(FileLockManager::new(locks_dir(config)).await?)),
        SharedBackend::Memory => Ok(Arc::new(MemoryLockManager::new())),
    }
}

/// Create the configured content store
pub async fn create_store(config: &Config) -> SwatchResult<Arc<dyn ContentStore>> {
    match config.store.backend {
        StoreBackend::Ipfs => Ok(Arc::new(IpfsContentStore::new(
            config.store.api_url.clone(),
            Duration::from_secs(config.store.timeout_secs),
        ))),
        StoreBackend::Local => Ok(Arc::new(LocalContentStore::new(store_dir(config)).await?)),
    }
}

/// Assemble a minter from configuration
pub async fn create_minter(config: &Config) -> SwatchResult<Minter> {
    let cache = create_cache(config).await?;
    let locks = create_lock_manager(config).await?;
    let store = create_store(config).await?;

    debug!(
        cache = cache.backend_name(),
        lock = locks.backend_name(),
        store = store.backend_name(),
        "Backends ready"
    );

    let minter = Minter::new(cache, locks, store, config.mint.settings());
    if config.general.ledger {
        Ok(minter.with_ledger(Ledger::new(ConfigManager::ledger_path(), true)))
    } else {
        Ok(minter)
    }
}
