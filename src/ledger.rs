//! Publication ledger
//!
//! Appends a JSON line for every image this process publishes, giving
//! operators a record of which colours were minted to which CIDs. Best
//! effort: a ledger failure is logged and never fails a mint.

use crate::color::ColorCode;
use crate::store::Cid;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// File-based ledger that appends JSON lines
#[derive(Debug, Clone)]
pub struct Ledger {
    enabled: bool,
    path: PathBuf,
}

impl Ledger {
    pub fn new(path: impl Into<PathBuf>, enabled: bool) -> Self {
        Self {
            enabled,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record a freshly published image
    pub async fn published(&self, color: &ColorCode, cid: &Cid, backend: &str) {
        self.log(
            "image.published",
            &serde_json::json!({
                "color": color,
                "cid": cid,
                "store": backend,
            }),
        )
        .await;
    }

    /// Log an event as a JSON line
    pub async fn log(&self, event: &str, data: &serde_json::Value) {
        if !self.enabled {
            return;
        }

        let entry = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "event": event,
            "data": data,
        });

        let mut line = match serde_json::to_string(&entry) {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to serialize ledger event: {}", e);
                return;
            }
        };
        line.push('\n');

        if let Err(e) = self.append(&line).await {
            warn!("Failed to write ledger {}: {}", self.path.display(), e);
        }
    }

    async fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn writes_published_line() {
        let dir = TempDir::new().unwrap();
        let ledger = Ledger::new(dir.path().join("ledger.jsonl"), true);

        ledger
            .published(
                &ColorCode::parse("1a2b3c").unwrap(),
                &Cid::new("bafy000example"),
                "ipfs",
            )
            .await;

        let content = tokio::fs::read_to_string(ledger.path()).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(content.trim()).unwrap();

        assert_eq!(parsed["event"], "image.published");
        assert_eq!(parsed["data"]["color"], "1A2B3C");
        assert_eq!(parsed["data"]["cid"], "bafy000example");
        assert!(parsed["timestamp"].is_string());
    }

    #[tokio::test]
    async fn appends_multiple_lines() {
        let dir = TempDir::new().unwrap();
        let ledger = Ledger::new(dir.path().join("nested").join("ledger.jsonl"), true);

        ledger.log("event.one", &serde_json::json!({})).await;
        ledger.log("event.two", &serde_json::json!({})).await;

        let content = tokio::fs::read_to_string(ledger.path()).await.unwrap();
        assert_eq!(content.trim().lines().count(), 2);
    }

    #[tokio::test]
    async fn skips_when_disabled() {
        let dir = TempDir::new().unwrap();
        let ledger = Ledger::new(dir.path().join("ledger.jsonl"), false);

        ledger.log("should.not.appear", &serde_json::json!({})).await;

        assert!(!ledger.path().exists());
    }
}
