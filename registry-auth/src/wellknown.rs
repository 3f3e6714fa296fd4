//! HTTP well-known record source for domain-proof authentication.

use crate::error::{AuthError, Result};
use crate::proof::RecordSource;
use async_trait::async_trait;
use reqwest::redirect::Policy;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Path serving the domain's auth record.
pub const WELL_KNOWN_PATH: &str = "/.well-known/mcp-registry-auth";

/// Hard cap on the well-known response body.
pub const MAX_WELL_KNOWN_BYTES: usize = 4096;

const USER_AGENT: &str = concat!("mcp-registry/", env!("CARGO_PKG_VERSION"));

/// Fetches `https://<domain>/.well-known/mcp-registry-auth`.
///
/// Redirects are disabled so a proof cannot be satisfied by content the
/// domain owner does not control.
pub struct WellKnownRecordSource {
    client: Client,
    base_url: Option<String>,
}

impl WellKnownRecordSource {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .redirect(Policy::none())
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AuthError::Http(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: None,
        })
    }

    /// Point the source at a fixed base URL instead of `https://<domain>`
    /// (tests, private deployments behind a proxy).
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let mut source = Self::new()?;
        source.base_url = Some(base_url.into());
        Ok(source)
    }

    fn record_url(&self, domain: &str) -> String {
        match &self.base_url {
            Some(base) => format!("{}{WELL_KNOWN_PATH}", base.trim_end_matches('/')),
            None => format!("https://{domain}{WELL_KNOWN_PATH}"),
        }
    }
}

#[async_trait]
impl RecordSource for WellKnownRecordSource {
    async fn fetch(&self, domain: &str) -> Result<Vec<String>> {
        let url = self.record_url(domain);
        debug!(url = %url, "Fetching well-known auth record");

        let mut response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AuthError::Http(e.to_string()))?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(AuthError::Http(format!(
                "{url} returned {}",
                response.status()
            )));
        }

        let mut body: Vec<u8> = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| AuthError::Http(e.to_string()))?
        {
            if body.len() + chunk.len() > MAX_WELL_KNOWN_BYTES {
                return Err(AuthError::ResponseTooLarge);
            }
            body.extend_from_slice(&chunk);
        }

        Ok(String::from_utf8_lossy(&body)
            .lines()
            .map(|line| line.to_string())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fetches_record_lines() {
        let mut upstream = mockito::Server::new_async().await;
        upstream
            .mock("GET", WELL_KNOWN_PATH)
            .with_status(200)
            .with_body("v=MCPv1; k=ed25519; p=AAAA\nsecond line")
            .create_async()
            .await;

        let source = WellKnownRecordSource::with_base_url(upstream.url()).unwrap();
        let records = source.fetch("example.com").await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].starts_with("v=MCPv1"));
    }

    #[tokio::test]
    async fn non_200_is_an_error() {
        let mut upstream = mockito::Server::new_async().await;
        upstream
            .mock("GET", WELL_KNOWN_PATH)
            .with_status(404)
            .create_async()
            .await;

        let source = WellKnownRecordSource::with_base_url(upstream.url()).unwrap();
        assert!(matches!(
            source.fetch("example.com").await,
            Err(AuthError::Http(_))
        ));
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let mut upstream = mockito::Server::new_async().await;
        upstream
            .mock("GET", WELL_KNOWN_PATH)
            .with_status(200)
            .with_body("x".repeat(MAX_WELL_KNOWN_BYTES + 1))
            .create_async()
            .await;

        let source = WellKnownRecordSource::with_base_url(upstream.url()).unwrap();
        assert!(matches!(
            source.fetch("example.com").await,
            Err(AuthError::ResponseTooLarge)
        ));
    }

    #[tokio::test]
    async fn redirects_are_not_followed() {
        let mut upstream = mockito::Server::new_async().await;
        upstream
            .mock("GET", WELL_KNOWN_PATH)
            .with_status(302)
            .with_header("location", "/elsewhere")
            .create_async()
            .await;

        let source = WellKnownRecordSource::with_base_url(upstream.url()).unwrap();
        assert!(matches!(
            source.fetch("example.com").await,
            Err(AuthError::Http(_))
        ));
    }
}
