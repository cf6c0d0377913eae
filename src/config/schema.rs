//! Configuration schema for Swatch
//!
//! Configuration is stored at `~/.config/swatch/config.toml`

use crate::keys::{DEFAULT_CACHE_PREFIX, DEFAULT_LOCK_PREFIX};
use crate::lock::AcquireOptions;
use crate::mint::MintSettings;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Mint workflow tunables
    pub mint: MintConfig,

    /// Colour → CID cache backend
    pub cache: CacheConfig,

    /// Lock backend
    pub lock: LockConfig,

    /// Content store backend
    pub store: StoreConfig,
}

impl Config {
    /// Check values serde cannot
    pub fn validate(&self) -> Result<(), String> {
        if self.mint.cache_prefix.is_empty() || self.mint.lock_prefix.is_empty() {
            return Err("mint.cache_prefix and mint.lock_prefix must not be empty".to_string());
        }
        if self.mint.cache_prefix == self.mint.lock_prefix {
            return Err("mint.cache_prefix and mint.lock_prefix must differ".to_string());
        }
        if self.mint.cache_ttl_secs == 0 {
            return Err("mint.cache_ttl_secs must be greater than 0".to_string());
        }
        if self.mint.lock_ttl_secs == 0 {
            return Err("mint.lock_ttl_secs must be greater than 0".to_string());
        }
        if self.store.timeout_secs == 0 {
            return Err("store.timeout_secs must be greater than 0".to_string());
        }
        // An upload still running when the lease ends would let a second
        // minter upload the same colour
        if self.store.backend == StoreBackend::Ipfs
            && self.store.timeout_secs >= self.mint.lock_ttl_secs
        {
            return Err(format!(
                "store.timeout_secs ({}) must be shorter than mint.lock_ttl_secs ({})",
                self.store.timeout_secs, self.mint.lock_ttl_secs
            ));
        }
        if !matches!(self.general.log_format.as_str(), "text" | "json") {
            return Err(format!(
                "general.log_format must be \"text\" or \"json\", got {:?}",
                self.general.log_format
            ));
        }
        Ok(())
    }
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,

    /// Append a ledger line for every published image
    pub ledger: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            ledger: true,
        }
    }
}

/// Mint workflow configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MintConfig {
    /// Key prefix for colour → CID entries
    pub cache_prefix: String,

    /// Key prefix for per-colour locks
    pub lock_prefix: String,

    /// How long a memoized CID lives (default: 1 day)
    pub cache_ttl_secs: u64,

    /// Lock lease; bounds how long a crashed minter blocks others
    pub lock_ttl_secs: u64,

    /// How long to wait for a busy lock before giving up
    pub lock_wait_ms: u64,

    /// Pause between lock attempts
    pub lock_retry_ms: u64,
}

impl Default for MintConfig {
    fn default() -> Self {
        Self {
            cache_prefix: DEFAULT_CACHE_PREFIX.to_string(),
            lock_prefix: DEFAULT_LOCK_PREFIX.to_string(),
            cache_ttl_secs: 86_400,
            lock_ttl_secs: 5,
            lock_wait_ms: 200,
            lock_retry_ms: 25,
        }
    }
}

impl MintConfig {
    /// Workflow settings for the minter
    pub fn settings(&self) -> MintSettings {
        MintSettings {
            cache_prefix: self.cache_prefix.clone(),
            lock_prefix: self.lock_prefix.clone(),
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
            lock: AcquireOptions {
                ttl: Duration::from_secs(self.lock_ttl_secs),
                max_wait: Duration::from_millis(self.lock_wait_ms),
                retry_interval: Duration::from_millis(self.lock_retry_ms),
            },
        }
    }
}

/// Cache and lock backend kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SharedBackend {
    /// Files in a directory shared by every minting process
    #[default]
    File,
    /// Process memory; only for single-process use
    Memory,
}

/// Cache configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: SharedBackend,

    /// Cache directory (default: <state dir>/cache)
    pub dir: Option<PathBuf>,
}

/// Lock configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    pub backend: SharedBackend,

    /// Lock directory (default: <state dir>/locks)
    pub dir: Option<PathBuf>,
}

/// Content store backend kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// IPFS node RPC API
    #[default]
    Ipfs,
    /// Content-addressed directory on this machine
    Local,
}

/// Content store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,

    /// IPFS RPC API base URL
    pub api_url: String,

    /// Upload timeout in seconds; must stay below the lock lease
    pub timeout_secs: u64,

    /// Local store directory (default: <state dir>/store)
    pub dir: Option<PathBuf>,

    /// Gateway base URL for asset links
    pub gateway: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Ipfs,
            api_url: "http://127.0.0.1:5001".to_string(),
            timeout_secs: 4,
            dir: None,
            gateway: "https://ipfs.io/ipfs".to_string(),
        }
    }
}
