//! Get-or-generate workflow
//!
//! [`Minter::mint`] returns the CID of a colour's swatch, generating and
//! publishing it at most once however many callers (in however many
//! processes) ask at the same time:
//!
//! 1. Read the cache. A hit returns immediately without locking.
//! 2. On a miss, take the colour's lock with a fresh holder token.
//! 3. Read the cache again. Whoever held the lock before us may have
//!    published already; a hit returns without generating.
//! 4. Render the image, upload it, and memoize the CID.
//! 5. Release the lock on every path out of steps 3-4.
//!
//! Steps 3-4 must finish inside the lock's lease. Once the lease runs out
//! another caller may take the lock, so the mint is abandoned with
//! [`SwatchError::LeaseExpired`] before anything is memoized.
//!
//! The operation only succeeds once the CID is memoized, so the next call
//! for the same colour is a fast-path hit.

use crate::cache::Cache;
use crate::color::ColorCode;
use crate::error::{SwatchError, SwatchResult};
use crate::image::{ImageGenerator, ProduceImage};
use crate::keys::{self, DEFAULT_CACHE_PREFIX, DEFAULT_LOCK_PREFIX};
use crate::ledger::Ledger;
use crate::lock::{AcquireOptions, LockGuard, LockManager};
use crate::store::{Cid, ContentStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// One day
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(86_400);

/// Tunables for the workflow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintSettings {
    /// Namespace for colour → CID entries
    pub cache_prefix: String,
    /// Namespace for per-colour locks
    pub lock_prefix: String,
    /// Lifetime of a memoized CID
    pub cache_ttl: Duration,
    /// Lock lease, wait budget and retry pacing
    pub lock: AcquireOptions,
}

impl Default for MintSettings {
    fn default() -> Self {
        Self {
            cache_prefix: DEFAULT_CACHE_PREFIX.to_string(),
            lock_prefix: DEFAULT_LOCK_PREFIX.to_string(),
            cache_ttl: DEFAULT_CACHE_TTL,
            lock: AcquireOptions::default(),
        }
    }
}

/// Composes cache, lock, generator and store into the mint workflow
pub struct Minter {
    cache: Arc<dyn Cache>,
    locks: Arc<dyn LockManager>,
    store: Arc<dyn ContentStore>,
    generator: Arc<dyn ProduceImage>,
    settings: MintSettings,
    ledger: Option<Ledger>,
}

impl Minter {
    pub fn new(
        cache: Arc<dyn Cache>,
        locks: Arc<dyn LockManager>,
        store: Arc<dyn ContentStore>,
        settings: MintSettings,
    ) -> Self {
        Self {
            cache,
            locks,
            store,
            generator: Arc::new(ImageGenerator::new()),
            settings,
            ledger: None,
        }
    }

    /// Render with `generator` instead of the built-in PNG encoder
    pub fn with_generator(mut self, generator: Arc<dyn ProduceImage>) -> Self {
        self.generator = generator;
        self
    }

    /// Record each publication in `ledger`
    pub fn with_ledger(mut self, ledger: Ledger) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn settings(&self) -> &MintSettings {
        &self.settings
    }

    /// Backend names as (cache, lock, store)
    pub fn backends(&self) -> (&'static str, &'static str, &'static str) {
        (
            self.cache.backend_name(),
            self.locks.backend_name(),
            self.store.backend_name(),
        )
    }

    /// Memoized CID for `color`, without locking or generating
    pub async fn lookup(&self, color: &ColorCode) -> SwatchResult<Option<Cid>> {
        let key = keys::cache_key(&self.settings.cache_prefix, color);
        Ok(self.cache.get(&key).await?.map(Cid::from))
    }

    /// CID of the swatch for `color`, publishing it first if needed
    #[instrument(skip_all, fields(color = %color))]
    pub async fn mint(&self, color: &ColorCode) -> SwatchResult<Cid> {
        let cache_key = keys::cache_key(&self.settings.cache_prefix, color);

        if let Some(cid) = self.cache.get(&cache_key).await? {
            debug!("Cache hit for {}", color);
            return Ok(Cid::from(cid));
        }

        let lock_key = keys::lock_key(&self.settings.lock_prefix, color);
        let holder = Uuid::new_v4().to_string();
        let guard = LockGuard::acquire(
            Arc::clone(&self.locks),
            &lock_key,
            &holder,
            self.settings.lock,
        )
        .await?;

        // Past the lease another caller may take the lock, so nothing
        // (not even the cache write) may run after the deadline
        let result = guard
            .run_within_lease(self.mint_locked(color, &cache_key))
            .await;
        guard.release().await;
        result
    }

    /// Critical section: runs only while the colour's lock is held
    async fn mint_locked(&self, color: &ColorCode, cache_key: &str) -> SwatchResult<Cid> {
        if let Some(cid) = self.cache.get(cache_key).await? {
            debug!("{} was published while waiting for the lock", color);
            return Ok(Cid::from(cid));
        }

        let image = self.generator.produce(color).map_err(|e| match e {
            SwatchError::GenerationFailure(_) => e,
            other => SwatchError::GenerationFailure(other.to_string()),
        })?;

        let cid = self.store.upload(image).await.map_err(|e| match e {
            SwatchError::UploadFailure(_) => e,
            other => SwatchError::UploadFailure(other.to_string()),
        })?;

        self.cache
            .set(cache_key, cid.as_str(), self.settings.cache_ttl)
            .await
            .map_err(|e| match e {
                SwatchError::CacheWriteFailure(_) => e,
                other => SwatchError::CacheWriteFailure(other.to_string()),
            })?;

        info!("Published {} as {}", color, cid);
        if let Some(ledger) = &self.ledger {
            ledger
                .published(color, &cid, self.store.backend_name())
                .await;
        }

        Ok(cid)
    }
}

impl std::fmt::Debug for Minter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (cache, lock, store) = self.backends();
        f.debug_struct("Minter")
            .field("cache", &cache)
            .field("lock", &lock)
            .field("store", &store)
            .field("settings", &self.settings)
            .finish()
    }
}
