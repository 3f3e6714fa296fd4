//! Shared bounded-read helper for upstream registry responses.

use crate::error::{Result, ValidatorError};

/// Upstream metadata responses are read through this cap. Real registry
/// payloads (npm version documents, PyPI project JSON, OCI config blobs)
/// regularly exceed a few KiB, so the cap is generous but still bounds a
/// hostile upstream.
pub const MAX_METADATA_BYTES: usize = 1024 * 1024;

/// Reads at most `cap` bytes of the response body, then stops.
pub(crate) async fn read_bounded(mut response: reqwest::Response, cap: usize) -> Result<Vec<u8>> {
    let mut buf: Vec<u8> = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| ValidatorError::Upstream(e.to_string()))?
    {
        let remaining = cap - buf.len();
        if chunk.len() >= remaining {
            buf.extend_from_slice(&chunk[..remaining]);
            break;
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}

/// Parses a bounded response body as JSON.
pub(crate) async fn read_json(response: reqwest::Response) -> Result<serde_json::Value> {
    let body = read_bounded(response, MAX_METADATA_BYTES).await?;
    serde_json::from_slice(&body).map_err(|e| ValidatorError::Upstream(format!("invalid JSON: {e}")))
}

/// Scans free-form text (readme, project description) for an
/// `mcp-name: <server name>` declaration line.
pub(crate) fn contains_mcp_name_declaration(text: &str, server_name: &str) -> bool {
    text.lines().any(|line| {
        line.trim()
            .strip_prefix("mcp-name:")
            .is_some_and(|rest| rest.trim() == server_name)
    })
}
