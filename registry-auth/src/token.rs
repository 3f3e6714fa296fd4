//! Capability tokens: short-lived signed envelopes carrying permission
//! grants. Stateless on the server; verified by signature alone.

use crate::error::{AuthError, Result};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use registry_core::PermissionGrant;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Token lifetime in seconds.
pub const TOKEN_TTL_SECONDS: i64 = 300;

/// Required signing-secret length in bytes.
pub const SECRET_LEN: usize = 32;

/// The closed set of token exchange methods.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AuthMethod {
    #[serde(rename = "dns")]
    Dns,
    #[serde(rename = "http")]
    Http,
    #[serde(rename = "github-pat")]
    GithubPat,
    #[serde(rename = "github-oidc")]
    GithubOidc,
    #[serde(rename = "oidc")]
    Oidc,
    #[serde(rename = "none")]
    Anonymous,
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AuthMethod::Dns => "dns",
            AuthMethod::Http => "http",
            AuthMethod::GithubPat => "github-pat",
            AuthMethod::GithubOidc => "github-oidc",
            AuthMethod::Oidc => "oidc",
            AuthMethod::Anonymous => "none",
        };
        f.write_str(s)
    }
}

/// Claims carried by a capability token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityClaims {
    pub auth_method: AuthMethod,
    pub sub: String,
    #[serde(default)]
    pub permissions: Vec<PermissionGrant>,
    pub iat: i64,
    pub exp: i64,
}

/// A freshly issued token plus its expiry, as returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedToken {
    pub registry_token: String,
    pub expires_at: i64,
}

/// Signs and verifies capability tokens with a process-wide 32-byte secret.
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenSigner {
    pub fn new(secret: &[u8]) -> Result<Self> {
        if secret.len() != SECRET_LEN {
            return Err(AuthError::Token(format!(
                "signing secret must be {SECRET_LEN} bytes, got {}",
                secret.len()
            )));
        }
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        })
    }

    /// Builds a signer from the hex-encoded secret used in configuration.
    pub fn from_hex(hex_secret: &str) -> Result<Self> {
        let secret = hex::decode(hex_secret)
            .map_err(|_| AuthError::Token("signing secret is not valid hex".to_string()))?;
        Self::new(&secret)
    }

    pub fn issue(
        &self,
        auth_method: AuthMethod,
        subject: impl Into<String>,
        permissions: Vec<PermissionGrant>,
    ) -> Result<SignedToken> {
        let now = Utc::now().timestamp();
        let claims = CapabilityClaims {
            auth_method,
            sub: subject.into(),
            permissions,
            iat: now,
            exp: now + TOKEN_TTL_SECONDS,
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Token(e.to_string()))?;

        Ok(SignedToken {
            registry_token: token,
            expires_at: claims.exp,
        })
    }

    pub fn verify(&self, token: &str) -> Result<CapabilityClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 5;
        decode::<CapabilityClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::Token(e.to_string()))
    }
}
