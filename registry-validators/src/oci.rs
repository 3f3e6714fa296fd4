//! OCI image ownership validation.
//!
//! Walks token -> manifest (first entry of a multi-arch index) -> config
//! blob, and requires the config label `io.modelcontextprotocol.server.name`
//! to equal the submitted server name. Rate-limited registries (HTTP 429)
//! skip validation rather than failing the publish.

use crate::error::{Result, ValidatorError};
use crate::fetch::read_json;
use registry_core::Package;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

/// Image-config label that declares the MCP server name.
pub const SERVER_NAME_LABEL: &str = "io.modelcontextprotocol.server.name";

const MANIFEST_ACCEPT: &str = "application/vnd.oci.image.manifest.v1+json, \
     application/vnd.oci.image.index.v1+json, \
     application/vnd.docker.distribution.manifest.v2+json, \
     application/vnd.docker.distribution.manifest.list.v2+json";

/// One OCI registry the validator knows how to talk to.
#[derive(Debug, Clone)]
pub struct OciRegistry {
    /// Base URL publishers put in `registryBaseUrl` (e.g. `https://docker.io`).
    pub base_url: String,
    /// Distribution API host (e.g. `https://registry-1.docker.io`).
    pub api_url: String,
    /// Anonymous pull-token endpoint, when the registry requires one.
    pub token_url: Option<String>,
    /// `service` parameter for the token endpoint.
    pub service: Option<String>,
}

impl OciRegistry {
    pub fn docker_io() -> Self {
        Self {
            base_url: "https://docker.io".to_string(),
            api_url: "https://registry-1.docker.io".to_string(),
            token_url: Some("https://auth.docker.io/token".to_string()),
            service: Some("registry.docker.io".to_string()),
        }
    }

    pub fn ghcr_io() -> Self {
        Self {
            base_url: "https://ghcr.io".to_string(),
            api_url: "https://ghcr.io".to_string(),
            token_url: Some("https://ghcr.io/token".to_string()),
            service: None,
        }
    }
}

enum Fetched {
    Doc(Value),
    RateLimited,
}

pub(crate) async fn validate(
    client: &Client,
    registry: &OciRegistry,
    server_name: &str,
    package: &Package,
) -> Result<()> {
    let token = match fetch_pull_token(client, registry, &package.identifier).await? {
        Fetched::Doc(v) => v.as_str().map(|s| s.to_string()),
        Fetched::RateLimited => {
            warn!(identifier = %package.identifier, "OCI token endpoint rate-limited, skipping validation");
            return Ok(());
        }
    };

    let manifest_url = format!(
        "{}/v2/{}/manifests/{}",
        registry.api_url, package.identifier, package.version
    );
    let mut manifest =
        match fetch_doc(client, &manifest_url, token.as_deref(), Some(MANIFEST_ACCEPT), package).await? {
            Fetched::Doc(doc) => doc,
            Fetched::RateLimited => {
                warn!(identifier = %package.identifier, "OCI registry rate-limited, skipping validation");
                return Ok(());
            }
        };

    // Multi-arch index: descend into the first listed manifest.
    if let Some(first) = manifest
        .get("manifests")
        .and_then(|m| m.as_array())
        .and_then(|m| m.first())
    {
        let digest = first
            .get("digest")
            .and_then(|d| d.as_str())
            .ok_or_else(|| ValidatorError::OciOwnership("index manifest has no digest".to_string()))?;
        let url = format!("{}/v2/{}/manifests/{}", registry.api_url, package.identifier, digest);
        manifest = match fetch_doc(client, &url, token.as_deref(), Some(MANIFEST_ACCEPT), package).await? {
            Fetched::Doc(doc) => doc,
            Fetched::RateLimited => {
                warn!(identifier = %package.identifier, "OCI registry rate-limited, skipping validation");
                return Ok(());
            }
        };
    }

    let config_digest = manifest
        .pointer("/config/digest")
        .and_then(|d| d.as_str())
        .ok_or_else(|| {
            ValidatorError::OciOwnership(format!(
                "manifest for {}:{} has no config digest",
                package.identifier, package.version
            ))
        })?;

    let blob_url = format!(
        "{}/v2/{}/blobs/{}",
        registry.api_url, package.identifier, config_digest
    );
    let config = match fetch_doc(client, &blob_url, token.as_deref(), None, package).await? {
        Fetched::Doc(doc) => doc,
        Fetched::RateLimited => {
            warn!(identifier = %package.identifier, "OCI registry rate-limited, skipping validation");
            return Ok(());
        }
    };

    let label = config
        .pointer("/config/Labels")
        .and_then(|l| l.get(SERVER_NAME_LABEL))
        .and_then(|v| v.as_str());

    match label {
        Some(declared) if declared == server_name => Ok(()),
        Some(declared) => Err(ValidatorError::OciOwnership(format!(
            "image {}:{} declares {SERVER_NAME_LABEL}={declared:?}, expected {server_name:?}",
            package.identifier, package.version
        ))),
        None => Err(ValidatorError::OciOwnership(format!(
            "image {}:{} does not carry the {SERVER_NAME_LABEL} label",
            package.identifier, package.version
        ))),
    }
}

async fn fetch_pull_token(
    client: &Client,
    registry: &OciRegistry,
    identifier: &str,
) -> Result<Fetched> {
    let Some(token_url) = &registry.token_url else {
        return Ok(Fetched::Doc(Value::Null));
    };

    let mut request = client
        .get(token_url)
        .query(&[("scope", format!("repository:{identifier}:pull"))]);
    if let Some(service) = &registry.service {
        request = request.query(&[("service", service.as_str())]);
    }

    debug!(token_url = %token_url, identifier = %identifier, "Fetching anonymous OCI pull token");
    let response = request
        .send()
        .await
        .map_err(|e| ValidatorError::Upstream(e.to_string()))?;

    if response.status() == StatusCode::TOO_MANY_REQUESTS {
        return Ok(Fetched::RateLimited);
    }
    if !response.status().is_success() {
        return Err(ValidatorError::Upstream(format!(
            "OCI token endpoint returned {}",
            response.status()
        )));
    }

    let doc = read_json(response).await?;
    let token = doc
        .get("token")
        .or_else(|| doc.get("access_token"))
        .cloned()
        .unwrap_or(Value::Null);
    Ok(Fetched::Doc(token))
}

async fn fetch_doc(
    client: &Client,
    url: &str,
    token: Option<&str>,
    accept: Option<&str>,
    package: &Package,
) -> Result<Fetched> {
    let mut request = client.get(url);
    if let Some(accept) = accept {
        request = request.header("Accept", accept);
    }
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }

    let response = request
        .send()
        .await
        .map_err(|e| ValidatorError::Upstream(e.to_string()))?;

    match response.status() {
        StatusCode::TOO_MANY_REQUESTS => Ok(Fetched::RateLimited),
        StatusCode::NOT_FOUND | StatusCode::UNAUTHORIZED => Err(ValidatorError::NotFound(format!(
            "OCI image {}:{} is not pullable",
            package.identifier, package.version
        ))),
        status if status.is_success() => Ok(Fetched::Doc(read_json(response).await?)),
        status => Err(ValidatorError::Upstream(format!(
            "OCI registry returned {status} for {url}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn oci_package(identifier: &str, version: &str) -> Package {
        serde_json::from_value(json!({
            "registryType": "oci",
            "identifier": identifier,
            "version": version
        }))
        .unwrap()
    }

    fn test_registry(server: &mockito::ServerGuard) -> OciRegistry {
        OciRegistry {
            base_url: server.url(),
            api_url: server.url(),
            token_url: Some(format!("{}/token", server.url())),
            service: None,
        }
    }

    #[tokio::test]
    async fn walks_manifest_to_config_label() {
        let mut upstream = mockito::Server::new_async().await;
        upstream
            .mock("GET", "/token")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(json!({"token": "anon"}).to_string())
            .create_async()
            .await;
        upstream
            .mock("GET", "/v2/acme/server/manifests/1.0.0")
            .with_status(200)
            .with_body(json!({"config": {"digest": "sha256:cfg"}}).to_string())
            .create_async()
            .await;
        upstream
            .mock("GET", "/v2/acme/server/blobs/sha256:cfg")
            .with_status(200)
            .with_body(
                json!({"config": {"Labels": {SERVER_NAME_LABEL: "io.example/server"}}}).to_string(),
            )
            .create_async()
            .await;

        let client = Client::new();
        validate(
            &client,
            &test_registry(&upstream),
            "io.example/server",
            &oci_package("acme/server", "1.0.0"),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn descends_into_multi_arch_index() {
        let mut upstream = mockito::Server::new_async().await;
        upstream
            .mock("GET", "/token")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(json!({"token": "anon"}).to_string())
            .create_async()
            .await;
        upstream
            .mock("GET", "/v2/acme/server/manifests/1.0.0")
            .with_status(200)
            .with_body(json!({"manifests": [{"digest": "sha256:arch0"}]}).to_string())
            .create_async()
            .await;
        upstream
            .mock("GET", "/v2/acme/server/manifests/sha256:arch0")
            .with_status(200)
            .with_body(json!({"config": {"digest": "sha256:cfg"}}).to_string())
            .create_async()
            .await;
        upstream
            .mock("GET", "/v2/acme/server/blobs/sha256:cfg")
            .with_status(200)
            .with_body(
                json!({"config": {"Labels": {SERVER_NAME_LABEL: "io.example/server"}}}).to_string(),
            )
            .create_async()
            .await;

        let client = Client::new();
        validate(
            &client,
            &test_registry(&upstream),
            "io.example/server",
            &oci_package("acme/server", "1.0.0"),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn rate_limited_registry_skips_validation() {
        let mut upstream = mockito::Server::new_async().await;
        upstream
            .mock("GET", "/token")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(json!({"token": "anon"}).to_string())
            .create_async()
            .await;
        upstream
            .mock("GET", "/v2/acme/server/manifests/1.0.0")
            .with_status(429)
            .create_async()
            .await;

        let client = Client::new();
        validate(
            &client,
            &test_registry(&upstream),
            "io.example/server",
            &oci_package("acme/server", "1.0.0"),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn wrong_label_is_an_ownership_failure() {
        let mut upstream = mockito::Server::new_async().await;
        upstream
            .mock("GET", "/token")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(json!({"token": "anon"}).to_string())
            .create_async()
            .await;
        upstream
            .mock("GET", "/v2/acme/server/manifests/1.0.0")
            .with_status(200)
            .with_body(json!({"config": {"digest": "sha256:cfg"}}).to_string())
            .create_async()
            .await;
        upstream
            .mock("GET", "/v2/acme/server/blobs/sha256:cfg")
            .with_status(200)
            .with_body(
                json!({"config": {"Labels": {SERVER_NAME_LABEL: "io.other/server"}}}).to_string(),
            )
            .create_async()
            .await;

        let client = Client::new();
        let err = validate(
            &client,
            &test_registry(&upstream),
            "io.example/server",
            &oci_package("acme/server", "1.0.0"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ValidatorError::OciOwnership(_)));
    }

    #[tokio::test]
    async fn unauthorized_maps_to_not_found() {
        let mut upstream = mockito::Server::new_async().await;
        upstream
            .mock("GET", "/token")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(json!({"token": "anon"}).to_string())
            .create_async()
            .await;
        upstream
            .mock("GET", "/v2/acme/server/manifests/1.0.0")
            .with_status(401)
            .create_async()
            .await;

        let client = Client::new();
        let err = validate(
            &client,
            &test_registry(&upstream),
            "io.example/server",
            &oci_package("acme/server", "1.0.0"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ValidatorError::NotFound(_)));
    }
}
