//! OIDC ID-token verification and the generic OIDC exchange.

use crate::error::{AuthError, Result};
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use registry_core::{Action, PermissionGrant};
use reqwest::Client;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("mcp-registry/", env!("CARGO_PKG_VERSION"));

/// Issuer, audience, and optional extra-claim equality checks.
#[derive(Debug, Clone)]
pub struct OidcConfig {
    pub issuer: String,
    pub client_id: String,
    pub extra_claims: HashMap<String, String>,
}

/// Verifies RS256 ID tokens against an issuer's published JWKS.
pub struct OidcVerifier {
    config: OidcConfig,
    client: Client,
}

impl OidcVerifier {
    pub fn new(config: OidcConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AuthError::Upstream(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    pub fn issuer(&self) -> &str {
        &self.config.issuer
    }

    /// Verifies the token signature, issuer, audience, and configured extra
    /// claims; returns the full claim set.
    pub async fn verify(&self, token: &str) -> Result<Map<String, Value>> {
        let header = decode_header(token).map_err(|e| AuthError::Token(e.to_string()))?;
        let kid = header
            .kid
            .ok_or_else(|| AuthError::Token("token header carries no key ID".to_string()))?;

        let jwks = self.fetch_jwks().await?;
        let jwk = jwks
            .find(&kid)
            .ok_or_else(|| AuthError::Token(format!("no JWKS key matches kid {kid}")))?;
        let key = DecodingKey::from_jwk(jwk).map_err(|e| AuthError::Token(e.to_string()))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.client_id]);

        let data = decode::<Map<String, Value>>(token, &key, &validation)
            .map_err(|e| AuthError::Token(e.to_string()))?;
        let claims = data.claims;

        for (claim, expected) in &self.config.extra_claims {
            let actual = claims
                .get(claim)
                .and_then(|v| v.as_str())
                .ok_or_else(|| AuthError::MissingClaim(claim.clone()))?;
            if actual != expected {
                return Err(AuthError::ClaimMismatch(claim.clone()));
            }
        }

        Ok(claims)
    }

    async fn fetch_jwks(&self) -> Result<JwkSet> {
        let discovery_url = format!(
            "{}/.well-known/openid-configuration",
            self.config.issuer.trim_end_matches('/')
        );
        debug!(url = %discovery_url, "Fetching OIDC discovery document");

        let discovery: Value = self
            .client
            .get(&discovery_url)
            .send()
            .await
            .map_err(|e| AuthError::Upstream(e.to_string()))?
            .error_for_status()
            .map_err(|e| AuthError::Upstream(e.to_string()))?
            .json()
            .await
            .map_err(|e| AuthError::Upstream(e.to_string()))?;

        let jwks_uri = discovery
            .get("jwks_uri")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AuthError::Upstream("discovery document has no jwks_uri".to_string()))?;

        self.client
            .get(jwks_uri)
            .send()
            .await
            .map_err(|e| AuthError::Upstream(e.to_string()))?
            .error_for_status()
            .map_err(|e| AuthError::Upstream(e.to_string()))?
            .json()
            .await
            .map_err(|e| AuthError::Upstream(e.to_string()))
    }
}

/// The generic OIDC exchange: verified subjects receive the resource
/// patterns configured for the deployment.
pub struct GenericOidcAuth {
    verifier: OidcVerifier,
    publish_patterns: Vec<String>,
    edit_patterns: Vec<String>,
}

impl GenericOidcAuth {
    pub fn new(
        verifier: OidcVerifier,
        publish_patterns: Vec<String>,
        edit_patterns: Vec<String>,
    ) -> Self {
        Self {
            verifier,
            publish_patterns,
            edit_patterns,
        }
    }

    /// Splits a comma-separated configuration string into patterns.
    pub fn parse_patterns(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub async fn exchange(&self, token: &str) -> Result<(String, Vec<PermissionGrant>)> {
        let claims = self.verifier.verify(token).await?;
        let subject = claims
            .get("sub")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AuthError::MissingClaim("sub".to_string()))?;

        let mut permissions = Vec::new();
        for pattern in &self.publish_patterns {
            permissions.push(PermissionGrant::new(Action::Publish, pattern.clone()));
        }
        for pattern in &self.edit_patterns {
            permissions.push(PermissionGrant::new(Action::Edit, pattern.clone()));
        }

        Ok((format!("oidc:{subject}"), permissions))
    }
}
