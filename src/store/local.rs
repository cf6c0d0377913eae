//! Content store on the local filesystem
//!
//! Computes CIDv1 (raw codec, sha2-256) itself, so identifiers match what an
//! IPFS node reports for the same single-block content added with
//! `--cid-version=1 --raw-leaves`.

use super::{Cid, ContentStore};
use crate::error::{SwatchError, SwatchResult};
use async_trait::async_trait;
use multihash_codetable::{Code, MultihashDigest};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

/// Multicodec for raw binary blocks
const RAW_CODEC: u64 = 0x55;

/// Content identifier for `bytes`
pub fn compute_cid(bytes: &[u8]) -> Cid {
    let digest = Code::Sha2_256.digest(bytes);
    Cid::new(::cid::Cid::new_v1(RAW_CODEC, digest).to_string())
}

/// Directory of blobs named by CID, every blob pinned
#[derive(Debug, Clone)]
pub struct LocalContentStore {
    root: PathBuf,
}

impl LocalContentStore {
    /// Open (creating if needed) a store rooted at `root`
    pub async fn new(root: impl Into<PathBuf>) -> SwatchResult<Self> {
        let root = root.into();
        for dir in [root.join("blobs"), root.join("pins")] {
            fs::create_dir_all(&dir)
                .await
                .map_err(|e| SwatchError::io(format!("creating {}", dir.display()), e))?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the blob for `cid`
    pub fn blob_path(&self, cid: &Cid) -> PathBuf {
        self.root.join("blobs").join(cid.as_str())
    }

    /// Whether `cid` is pinned
    pub fn is_pinned(&self, cid: &Cid) -> bool {
        self.root.join("pins").join(cid.as_str()).exists()
    }

    /// Read back stored content
    pub async fn read(&self, cid: &Cid) -> SwatchResult<Option<Vec<u8>>> {
        match fs::read(self.blob_path(cid)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SwatchError::io(format!("reading blob {}", cid), e)),
        }
    }
}

#[async_trait]
impl ContentStore for LocalContentStore {
    async fn upload(&self, bytes: Vec<u8>) -> SwatchResult<Cid> {
        let cid = compute_cid(&bytes);
        let blob = self.blob_path(&cid);

        if !blob.exists() {
            let tmp = self.root.join("blobs").join(format!("{}.tmp", Uuid::new_v4()));
            fs::write(&tmp, &bytes).await.map_err(|e| {
                SwatchError::UploadFailure(format!("writing {}: {}", tmp.display(), e))
            })?;
            fs::rename(&tmp, &blob).await.map_err(|e| {
                SwatchError::UploadFailure(format!("storing {}: {}", blob.display(), e))
            })?;
        }

        let pin = self.root.join("pins").join(cid.as_str());
        fs::write(&pin, b"")
            .await
            .map_err(|e| SwatchError::UploadFailure(format!("pinning {}: {}", cid, e)))?;

        debug!("Stored {} bytes as {}", bytes.len(), cid);
        Ok(cid)
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn cid_is_v1_raw_base32() {
        let cid = compute_cid(b"hello");
        assert!(cid.as_str().starts_with("bafkrei"), "got {}", cid);
        assert_eq!(cid, compute_cid(b"hello"));
        assert_ne!(cid, compute_cid(b"hello!"));
    }

    #[tokio::test]
    async fn upload_is_idempotent_and_pinned() {
        let temp = TempDir::new().unwrap();
        let store = LocalContentStore::new(temp.path()).await.unwrap();

        let first = store.upload(b"swatch".to_vec()).await.unwrap();
        let second = store.upload(b"swatch".to_vec()).await.unwrap();

        assert_eq!(first, second);
        assert!(store.is_pinned(&first));
        assert_eq!(
            store.read(&first).await.unwrap().as_deref(),
            Some(&b"swatch"[..])
        );
        assert_eq!(std::fs::read_dir(temp.path().join("blobs")).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn read_unknown_is_none() {
        let temp = TempDir::new().unwrap();
        let store = LocalContentStore::new(temp.path()).await.unwrap();
        assert!(store.read(&Cid::new("bafkreinope")).await.unwrap().is_none());
    }
}
