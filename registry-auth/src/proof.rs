//! Domain-proof verification shared by the DNS and HTTP exchanges.
//!
//! A domain owner publishes `v=MCPv1; k=ed25519; p=<base64 public key>` via
//! DNS TXT or the HTTP well-known path, then signs the current RFC3339
//! timestamp with the matching private key to obtain a token.

use crate::error::{AuthError, Result};
use crate::token::AuthMethod;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use registry_core::{reverse_domain, validate_domain, Action, PermissionGrant};
use ring::signature::{UnparsedPublicKey, ED25519};
use serde::Deserialize;
use tracing::debug;

/// Allowed difference between the submitted timestamp and the server clock.
pub const CLOCK_SKEW_SECONDS: i64 = 15;

/// Ed25519 signature length in bytes.
const SIGNATURE_LEN: usize = 64;

/// Ed25519 public key length in bytes.
const PUBLIC_KEY_LEN: usize = 32;

/// Proof payload submitted to the DNS and HTTP exchange endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct DomainProof {
    pub domain: String,
    pub timestamp: String,
    pub signed_timestamp: String,
}

/// Where auth records for a domain come from (DNS TXT, HTTP well-known, or
/// an in-memory source in tests).
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch(&self, domain: &str) -> Result<Vec<String>>;
}

/// Parses one record; returns the declared public key when the record is a
/// well-formed `v=MCPv1; k=ed25519; p=<base64>` declaration.
pub fn parse_auth_record(record: &str) -> Option<Vec<u8>> {
    let mut version_ok = false;
    let mut key_type_ok = false;
    let mut public_key = None;

    for part in record.split(';') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key.trim() {
            "v" => version_ok = value.trim() == "MCPv1",
            "k" => key_type_ok = value.trim() == "ed25519",
            "p" => public_key = BASE64.decode(value.trim()).ok(),
            _ => {}
        }
    }

    if version_ok && key_type_ok {
        public_key.filter(|k| k.len() == PUBLIC_KEY_LEN)
    } else {
        None
    }
}

/// Checks the submitted timestamp parses as RFC3339 and is within the skew
/// window around `now`.
pub fn verify_timestamp(timestamp: &str, now: DateTime<Utc>) -> Result<()> {
    let parsed = DateTime::parse_from_rfc3339(timestamp)
        .map_err(|e| AuthError::InvalidTimestamp(e.to_string()))?;

    let skew = (now - parsed.with_timezone(&Utc)).num_seconds().abs();
    if skew > CLOCK_SKEW_SECONDS {
        return Err(AuthError::TimestampOutOfRange);
    }
    Ok(())
}

/// Verifies the hex-encoded signature over `message` against any of `keys`.
pub fn verify_signature(keys: &[Vec<u8>], message: &str, signature_hex: &str) -> Result<()> {
    let signature = hex::decode(signature_hex).map_err(|_| AuthError::MalformedSignature)?;
    if signature.len() != SIGNATURE_LEN {
        return Err(AuthError::MalformedSignature);
    }

    for key in keys {
        if UnparsedPublicKey::new(&ED25519, key)
            .verify(message.as_bytes(), &signature)
            .is_ok()
        {
            return Ok(());
        }
    }
    Err(AuthError::SignatureVerification)
}

/// The shared DNS/HTTP exchange core: a record source plus a scope flag.
///
/// DNS proof covers subdomains (`rev/*` and `rev.*`); the HTTP well-known
/// proof covers only the exact domain (`rev/*`).
pub struct DomainAuth {
    method: AuthMethod,
    source: Box<dyn RecordSource>,
    include_subdomains: bool,
}

impl DomainAuth {
    pub fn new(method: AuthMethod, source: Box<dyn RecordSource>, include_subdomains: bool) -> Self {
        Self {
            method,
            source,
            include_subdomains,
        }
    }

    /// Verifies the proof and returns the token subject and granted
    /// permissions.
    pub async fn authenticate(
        &self,
        proof: &DomainProof,
        now: DateTime<Utc>,
    ) -> Result<(String, Vec<PermissionGrant>)> {
        validate_domain(&proof.domain).map_err(|e| AuthError::InvalidDomain(e.to_string()))?;
        verify_timestamp(&proof.timestamp, now)?;

        let records = self.source.fetch(&proof.domain).await?;
        let keys: Vec<Vec<u8>> = records.iter().filter_map(|r| parse_auth_record(r)).collect();
        debug!(domain = %proof.domain, keys = keys.len(), "Fetched domain auth records");
        if keys.is_empty() {
            return Err(AuthError::NoAuthRecord(proof.domain.clone()));
        }

        verify_signature(&keys, &proof.timestamp, &proof.signed_timestamp)?;

        let reversed = reverse_domain(&proof.domain);
        let mut permissions = vec![PermissionGrant::new(Action::Publish, format!("{reversed}/*"))];
        if self.include_subdomains {
            permissions.push(PermissionGrant::new(Action::Publish, format!("{reversed}.*")));
        }

        Ok((format!("{}:{}", self.method, proof.domain), permissions))
    }
}
