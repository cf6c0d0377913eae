//! Directory-backed cache shared between processes

use super::Cache;
use crate::error::{SwatchError, SwatchResult};
use crate::keys::file_stem;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

/// On-disk cache entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct StoredEntry {
    key: String,
    value: String,
    expires_at: DateTime<Utc>,
}

impl StoredEntry {
    fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Cache storing one JSON file per key
///
/// Every process pointed at the same directory sees the same entries.
/// Writes land in a temp file and are renamed into place, so readers never
/// see a half-written entry.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    /// Open (creating if needed) a cache directory
    pub async fn new(dir: impl Into<PathBuf>) -> SwatchResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| SwatchError::io(format!("creating cache dir {}", dir.display()), e))?;
        Ok(Self { dir })
    }

    /// Directory holding the entries
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Remove every entry, returning how many were removed
    pub async fn clear(&self) -> SwatchResult<usize> {
        let mut entries = fs::read_dir(&self.dir)
            .await
            .map_err(|e| SwatchError::io("reading cache directory", e))?;

        let mut removed = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SwatchError::io("reading cache entry", e))?
        {
            if entry.path().extension().is_some_and(|ext| ext == "json") {
                fs::remove_file(entry.path())
                    .await
                    .map_err(|e| SwatchError::io("removing cache file", e))?;
                removed += 1;
            }
        }

        Ok(removed)
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(key)))
    }

    /// Remove the entry at `path` if it is still the `expired` one we read
    ///
    /// A writer may have replaced it since; the entry is moved aside first
    /// and put back unless it turns out to be the expired one.
    async fn remove_expired(&self, path: &Path, expired: &StoredEntry) {
        let tombstone = self.dir.join(format!(
            "{}.{}.stale",
            file_stem(&expired.key),
            Uuid::new_v4()
        ));

        match fs::rename(path, &tombstone).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return,
            Err(e) => {
                debug!("Could not remove expired cache entry {}: {}", path.display(), e);
                return;
            }
        }

        let taken = fs::read_to_string(&tombstone)
            .await
            .ok()
            .and_then(|content| serde_json::from_str::<StoredEntry>(&content).ok());

        if taken.as_ref() != Some(expired) {
            // Restore the newer entry unless an even newer one already landed
            match fs::hard_link(&tombstone, path).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
                Err(e) => warn!("Could not restore cache entry {}: {}", path.display(), e),
            }
        }

        let _ = fs::remove_file(&tombstone).await;
    }
}

#[async_trait]
impl Cache for FileCache {
    async fn get(&self, key: &str) -> SwatchResult<Option<String>> {
        let path = self.entry_path(key);

        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SwatchError::CacheReadFailure(format!(
                    "reading {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let entry: StoredEntry = serde_json::from_str(&content).map_err(|e| {
            SwatchError::CacheReadFailure(format!("parsing {}: {}", path.display(), e))
        })?;

        if entry.key != key {
            return Err(SwatchError::CacheReadFailure(format!(
                "{} holds key {:?}, expected {:?}",
                path.display(),
                entry.key,
                key
            )));
        }

        if entry.is_expired() {
            debug!("Cache entry {} is expired", key);
            self.remove_expired(&path, &entry).await;
            return Ok(None);
        }

        Ok(Some(entry.value))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> SwatchResult<()> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| SwatchError::CacheWriteFailure(format!("ttl out of range: {}", e)))?;

        let entry = StoredEntry {
            key: key.to_string(),
            value: value.to_string(),
            expires_at: Utc::now() + ttl,
        };
        let content = serde_json::to_string_pretty(&entry)
            .map_err(|e| SwatchError::CacheWriteFailure(format!("serializing entry: {}", e)))?;

        let path = self.entry_path(key);
        let tmp = self.dir.join(format!("{}.{}.tmp", file_stem(key), Uuid::new_v4()));

        fs::write(&tmp, content).await.map_err(|e| {
            SwatchError::CacheWriteFailure(format!("writing {}: {}", tmp.display(), e))
        })?;

        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(SwatchError::CacheWriteFailure(format!(
                "moving entry into {}: {}",
                path.display(),
                e
            )));
        }

        debug!("Cached {} until {}", key, entry.expires_at);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}
