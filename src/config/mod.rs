//! Configuration management for Swatch

pub mod schema;

pub use schema::Config;

use crate::error::{SwatchError, SwatchResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("swatch")
            .join("config.toml")
    }

    /// Get the state directory path
    pub fn state_dir() -> PathBuf {
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("swatch")
    }

    /// Default directory for the file cache
    pub fn cache_dir() -> PathBuf {
        Self::state_dir().join("cache")
    }

    /// Default directory for lock files
    pub fn locks_dir() -> PathBuf {
        Self::state_dir().join("locks")
    }

    /// Default root of the local content store
    pub fn store_dir() -> PathBuf {
        Self::state_dir().join("store")
    }

    /// Get the publication ledger path
    pub fn ledger_path() -> PathBuf {
        Self::state_dir().join("ledger.jsonl")
    }

    /// Load configuration, using defaults if the file does not exist
    pub async fn load(&self) -> SwatchResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load and validate configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> SwatchResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| SwatchError::io(format!("reading config from {}", path.display()), e))?;

        let config: Config = toml::from_str(&content).map_err(|e| SwatchError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config
            .validate()
            .map_err(|reason| SwatchError::ConfigInvalid {
                path: path.to_path_buf(),
                reason,
            })?;

        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> SwatchResult<()> {
        self.ensure_config_dir().await?;

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            SwatchError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Ensure the config directory exists
    async fn ensure_config_dir(&self) -> SwatchResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| SwatchError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// Ensure the state directory exists
    pub async fn ensure_state_dirs() -> SwatchResult<()> {
        let dir = Self::state_dir();
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| SwatchError::io(format!("creating directory {}", dir.display()), e))
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema::StoreBackend;
    use serial_test::serial;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_default_when_missing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nonexistent.toml");
        let manager = ConfigManager::with_path(path);

        let config = manager.load().await.unwrap();
        assert_eq!(config.mint.lock_ttl_secs, 5);
    }

    #[tokio::test]
    async fn save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");
        let manager = ConfigManager::with_path(path);

        let mut config = Config::default();
        config.store.backend = StoreBackend::Local;
        config.mint.lock_wait_ms = 750;

        manager.save(&config).await.unwrap();
        let loaded = manager.load().await.unwrap();

        assert_eq!(loaded.store.backend, StoreBackend::Local);
        assert_eq!(loaded.mint.lock_wait_ms, 750);
    }

    #[tokio::test]
    async fn invalid_file_reports_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[mint]\ncache_prefix = \"x:\"\nlock_prefix = \"x:\"\n").unwrap();

        let err = ConfigManager::with_path(path.clone()).load().await.unwrap_err();
        match err {
            SwatchError::ConfigInvalid { path: p, reason } => {
                assert_eq!(p, path);
                assert!(reason.contains("must differ"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    #[serial]
    fn state_paths_follow_xdg_state_home() {
        let temp = TempDir::new().unwrap();
        let previous = std::env::var_os("XDG_STATE_HOME");
        std::env::set_var("XDG_STATE_HOME", temp.path());

        let state = temp.path().join("swatch");
        assert_eq!(ConfigManager::state_dir(), state);
        assert_eq!(ConfigManager::cache_dir(), state.join("cache"));
        assert_eq!(ConfigManager::locks_dir(), state.join("locks"));
        assert_eq!(ConfigManager::store_dir(), state.join("store"));
        assert_eq!(ConfigManager::ledger_path(), state.join("ledger.jsonl"));

        match previous {
            Some(value) => std::env::set_var("XDG_STATE_HOME", value),
            None => std::env::remove_var("XDG_STATE_HOME"),
        }
    }
}
