//! Key/value cache with per-entry expiry
//!
//! Remembers colour → CID mappings so repeat requests skip generation and
//! upload. A miss and an expired entry look the same to callers: both read
//! as `None`. There is no compare-and-swap; staleness is bounded only by TTL.
//!
//! # Backends
//!
//! | Backend | Scope | Clock |
//! |---------|-------|-------|
//! | `memory` | one process | tokio monotonic |
//! | `file` | processes sharing a directory | wall clock (UTC) |

mod file;
mod memory;

pub use file::FileCache;
pub use memory::MemoryCache;

use crate::error::SwatchResult;
use async_trait::async_trait;
use std::time::Duration;

/// Abstract cache interface
#[async_trait]
pub trait Cache: Send + Sync {
    /// Read a live entry
    async fn get(&self, key: &str) -> SwatchResult<Option<String>>;

    /// Write an entry that expires after `ttl`, replacing any previous value
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> SwatchResult<()>;

    /// Human-readable backend name for display
    fn backend_name(&self) -> &'static str;
}
