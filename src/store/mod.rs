//! Content-addressed blob publishing
//!
//! A [`ContentStore`] takes bytes and returns their content identifier.
//! Identical bytes always yield the identical [`Cid`], so uploading the same
//! image twice is harmless. Uploaded content is pinned against garbage
//! collection. Stores never retry internally; that is the caller's call.

mod ipfs;
mod local;

pub use ipfs::IpfsContentStore;
pub use local::LocalContentStore;

use crate::error::SwatchResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Content identifier returned by a store
///
/// Opaque: never parsed, only stored, compared and displayed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cid(String);

impl Cid {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Externally viewable link for this content under a gateway base URL
    pub fn gateway_url(&self, base: &str) -> String {
        format!("{}/{}", base.trim_end_matches('/'), self.0)
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Cid {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Abstract content store interface
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store and pin `bytes`, returning their content identifier
    async fn upload(&self, bytes: Vec<u8>) -> SwatchResult<Cid>;

    /// Human-readable backend name for display
    fn backend_name(&self) -> &'static str;
}
