//! IPFS HTTP RPC content store
//!
//! Uploads via `POST /api/v0/add` on a Kubo-compatible node with pinning
//! enabled and CIDv1 output. `ureq` is blocking, so each request runs on
//! the blocking thread pool.

use super::{Cid, ContentStore};
use crate::error::{SwatchError, SwatchResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// Reply from `/api/v0/add`
#[derive(Debug, Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: String,
    #[serde(rename = "Size", default)]
    size: Option<String>,
}

/// Content store backed by an IPFS node's RPC API
#[derive(Clone)]
pub struct IpfsContentStore {
    api_url: String,
    agent: ureq::Agent,
}

impl IpfsContentStore {
    /// Create a store talking to the RPC API at `api_url`
    /// (e.g. `http://127.0.0.1:5001`)
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();

        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            agent: config.into(),
        }
    }

    /// Endpoint for adding and pinning content
    pub fn add_url(&self) -> String {
        format!("{}/api/v0/add?pin=true&cid-version=1", self.api_url)
    }

    fn add_blocking(agent: &ureq::Agent, url: &str, bytes: &[u8]) -> SwatchResult<Cid> {
        let boundary = format!("swatch-{}", Uuid::new_v4().simple());
        let body = multipart_body(&boundary, bytes);

        let mut response = agent
            .post(url)
            .header(
                "Content-Type",
                &format!("multipart/form-data; boundary={}", boundary),
            )
            .send(&body[..])
            .map_err(|e| SwatchError::UploadFailure(format!("POST {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SwatchError::UploadFailure(format!(
                "POST {}: node answered {}",
                url,
                status.as_u16()
            )));
        }

        let text = response
            .body_mut()
            .read_to_string()
            .map_err(|e| SwatchError::UploadFailure(format!("reading add response: {}", e)))?;

        parse_add_response(&text)
    }
}

impl std::fmt::Debug for IpfsContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpfsContentStore")
            .field("api_url", &self.api_url)
            .finish()
    }
}

#[async_trait]
impl ContentStore for IpfsContentStore {
    async fn upload(&self, bytes: Vec<u8>) -> SwatchResult<Cid> {
        let agent = self.agent.clone();
        let url = self.add_url();
        let len = bytes.len();

        debug!("Uploading {} bytes to {}", len, url);
        let cid = tokio::task::spawn_blocking(move || Self::add_blocking(&agent, &url, &bytes))
            .await
            .map_err(|e| SwatchError::UploadFailure(format!("upload task failed: {}", e)))??;

        info!("Pinned {} ({} bytes)", cid, len);
        Ok(cid)
    }

    fn backend_name(&self) -> &'static str {
        "ipfs"
    }
}

/// Single-file `multipart/form-data` body as the add endpoint expects
fn multipart_body(boundary: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(bytes.len() + 256);
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"file\"; filename=\"swatch.png\"\r\n",
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}

/// Extract the CID from an add reply
///
/// The endpoint streams one JSON object per line; with a single file the
/// last line describes it.
fn parse_add_response(text: &str) -> SwatchResult<Cid> {
    let line = text
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| SwatchError::UploadFailure("empty add response".to_string()))?;

    let reply: AddResponse = serde_json::from_str(line)
        .map_err(|e| SwatchError::UploadFailure(format!("malformed add response: {}", e)))?;

    if reply.hash.is_empty() {
        return Err(SwatchError::UploadFailure(
            "add response has no Hash".to_string(),
        ));
    }

    debug!("Add reported size {:?}", reply.size);
    Ok(Cid::new(reply.hash))
}
