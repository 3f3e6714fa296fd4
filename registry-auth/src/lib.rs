//! Authentication exchanges and capability tokens for the MCP registry.
//!
//! Each exchange verifies a proof of namespace ownership (DNS TXT, HTTP
//! well-known, GitHub OIDC/PAT, generic OIDC, or nothing for the gated
//! anonymous method) and issues a short-lived capability token whose
//! permission grants scope what the holder may publish or edit.

pub mod anonymous;
pub mod dns;
pub mod error;
pub mod github;
pub mod oidc;
pub mod proof;
pub mod token;
pub mod wellknown;

pub use anonymous::{anonymous_grants, ANONYMOUS_NAMESPACE, ANONYMOUS_SUBJECT};
pub use dns::DnsRecordSource;
pub use error::{AuthError, Result};
pub use github::{GithubAuth, GITHUB_API_URL, GITHUB_OIDC_ISSUER};
pub use oidc::{GenericOidcAuth, OidcConfig, OidcVerifier};
pub use proof::{
    parse_auth_record, verify_signature, verify_timestamp, DomainAuth, DomainProof, RecordSource,
    CLOCK_SKEW_SECONDS,
};
pub use token::{
    AuthMethod, CapabilityClaims, SignedToken, TokenSigner, SECRET_LEN, TOKEN_TTL_SECONDS,
};
pub use wellknown::{WellKnownRecordSource, MAX_WELL_KNOWN_BYTES, WELL_KNOWN_PATH};
