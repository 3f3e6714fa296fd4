//! GitHub exchanges: personal access tokens and Actions OIDC tokens.
//!
//! Both prove control of a GitHub account or organization and scope the
//! token to `io.github.<owner>/*`.

use crate::error::{AuthError, Result};
use crate::oidc::{OidcConfig, OidcVerifier};
use registry_core::{Action, PermissionGrant};
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// GitHub REST API host.
pub const GITHUB_API_URL: &str = "https://api.github.com";

/// Issuer for GitHub Actions OIDC tokens.
pub const GITHUB_OIDC_ISSUER: &str = "https://token.actions.githubusercontent.com";

const USER_AGENT: &str = concat!("mcp-registry/", env!("CARGO_PKG_VERSION"));

pub struct GithubAuth {
    client: Client,
    api_base: String,
    oidc: Option<OidcVerifier>,
}

impl GithubAuth {
    /// `client_id` is the OIDC audience; without it only the PAT exchange is
    /// available.
    pub fn new(client_id: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AuthError::Upstream(format!("failed to create HTTP client: {e}")))?;

        let oidc = match client_id {
            Some(client_id) => Some(OidcVerifier::new(OidcConfig {
                issuer: GITHUB_OIDC_ISSUER.to_string(),
                client_id,
                extra_claims: HashMap::new(),
            })?),
            None => None,
        };

        Ok(Self {
            client,
            api_base: GITHUB_API_URL.to_string(),
            oidc,
        })
    }

    /// Point the PAT exchange at a custom API host (tests, GHE).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Exchanges a personal access token for publisher permissions on the
    /// authenticated user's namespace.
    pub async fn exchange_pat(&self, pat: &str) -> Result<(String, Vec<PermissionGrant>)> {
        let url = format!("{}/user", self.api_base);
        debug!(url = %url, "Resolving GitHub PAT owner");

        let response = self
            .client
            .get(&url)
            .bearer_auth(pat)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| AuthError::Upstream(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::Token(format!(
                "GitHub rejected the token: {}",
                response.status()
            )));
        }

        let user: Value = response
            .json()
            .await
            .map_err(|e| AuthError::Upstream(e.to_string()))?;
        let login = user
            .get("login")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AuthError::MissingClaim("login".to_string()))?;

        Ok((format!("github:{login}"), owner_grants(login)))
    }

    /// Verifies a GitHub Actions OIDC token and scopes permissions to the
    /// repository owner from its claims.
    pub async fn exchange_oidc(&self, token: &str) -> Result<(String, Vec<PermissionGrant>)> {
        let verifier = self
            .oidc
            .as_ref()
            .ok_or(AuthError::MethodNotConfigured("github-oidc"))?;

        let claims = verifier.verify(token).await?;
        let owner = claims
            .get("repository_owner")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AuthError::MissingClaim("repository_owner".to_string()))?;

        Ok((format!("github:{owner}"), owner_grants(owner)))
    }
}

fn owner_grants(owner: &str) -> Vec<PermissionGrant> {
    let owner = owner.to_lowercase();
    vec![
        PermissionGrant::new(Action::Publish, format!("io.github.{owner}/*")),
        PermissionGrant::new(Action::Edit, format!("io.github.{owner}/*")),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn pat_exchange_scopes_to_login_namespace() {
        let mut upstream = mockito::Server::new_async().await;
        upstream
            .mock("GET", "/user")
            .with_status(200)
            .with_body(json!({"login": "OctoCat"}).to_string())
            .create_async()
            .await;

        let auth = GithubAuth::new(None).unwrap().with_api_base(upstream.url());
        let (subject, permissions) = auth.exchange_pat("ghp_test").await.unwrap();

        assert_eq!(subject, "github:OctoCat");
        assert_eq!(
            permissions,
            vec![
                PermissionGrant::new(Action::Publish, "io.github.octocat/*"),
                PermissionGrant::new(Action::Edit, "io.github.octocat/*"),
            ]
        );
    }

    #[tokio::test]
    async fn rejected_pat_maps_to_token_error() {
        let mut upstream = mockito::Server::new_async().await;
        upstream
            .mock("GET", "/user")
            .with_status(401)
            .create_async()
            .await;

        let auth = GithubAuth::new(None).unwrap().with_api_base(upstream.url());
        assert!(matches!(
            auth.exchange_pat("ghp_bad").await,
            Err(AuthError::Token(_))
        ));
    }

    #[tokio::test]
    async fn oidc_exchange_requires_configuration() {
        let auth = GithubAuth::new(None).unwrap();
        assert!(matches!(
            auth.exchange_oidc("header.payload.sig").await,
            Err(AuthError::MethodNotConfigured("github-oidc"))
        ));
    }
}
