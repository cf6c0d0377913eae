//! Error types for Swatch
//!
//! All modules use `SwatchResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Swatch operations
pub type SwatchResult<T> = Result<T, SwatchError>;

/// All errors that can occur in Swatch
#[derive(Error, Debug)]
pub enum SwatchError {
    // Input errors
    #[error("Invalid colour code: {0:?} (expected six hex digits, e.g. 1A2B3C)")]
    InvalidColor(String),

    // Lock errors
    #[error("Timed out after {waited_ms}ms waiting for lock {key}")]
    LockTimeout { key: String, waited_ms: u64 },

    #[error("Lock {key} is held by another holder, not released")]
    LockOwnershipMismatch { key: String },

    #[error("Lock {key} lease of {ttl_ms}ms ran out before the image was published")]
    LeaseExpired { key: String, ttl_ms: u64 },

    #[error("Lock backend error: {0}")]
    LockBackend(String),

    // Workflow errors
    #[error("Image generation failed: {0}")]
    GenerationFailure(String),

    #[error("Upload to content store failed: {0}")]
    UploadFailure(String),

    #[error("Cache read failed: {0}")]
    CacheReadFailure(String),

    #[error("Cache write failed: {0}")]
    CacheWriteFailure(String),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("{0}")]
    User(String),
}

impl SwatchError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Check if error is retryable
    ///
    /// Lock contention and content-store transport problems clear up on
    /// their own; uploads are idempotent so a retry is always safe.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::LockTimeout { .. }
                | Self::LeaseExpired { .. }
                | Self::UploadFailure(_)
                | Self::CacheWriteFailure(_)
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::InvalidColor(_) => Some("Pass six hex digits, with or without a leading '#'"),
            Self::LockTimeout { .. } => {
                Some("Another process is minting this colour; retry in a moment")
            }
            Self::LeaseExpired { .. } => {
                Some("Raise mint.lock_ttl_secs or lower store.timeout_secs, then retry")
            }
            Self::UploadFailure(_) => {
                Some("Check that the IPFS API is reachable (store.api_url in config)")
            }
            Self::ConfigInvalid { .. } => Some("Run: swatch config show"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = SwatchError::LockTimeout {
            key: "swatch:img.lock:1A2B3C".to_string(),
            waited_ms: 200,
        };
        assert!(err.to_string().contains("200ms"));
        assert!(err.to_string().contains("1A2B3C"));
    }

    #[test]
    fn error_hint() {
        let err = SwatchError::InvalidColor("zz".to_string());
        assert!(err.hint().is_some());
        assert_eq!(SwatchError::User("x".to_string()).hint(), None);
    }

    #[test]
    fn error_retryable() {
        assert!(SwatchError::UploadFailure("connection refused".to_string()).is_retryable());
        assert!(SwatchError::LockTimeout {
            key: "k".to_string(),
            waited_ms: 0
        }
        .is_retryable());
        assert!(SwatchError::LeaseExpired {
            key: "k".to_string(),
            ttl_ms: 5000
        }
        .is_retryable());
        assert!(!SwatchError::GenerationFailure("bad".to_string()).is_retryable());
    }
}
