//! Server-name and domain validation helpers.

use crate::error::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum allowed server name length
pub const MAX_SERVER_NAME_LENGTH: usize = 200;

/// Maximum allowed domain length per RFC 1035
pub const MAX_DOMAIN_LENGTH: usize = 253;

/// Server names are `<reverse-dns-namespace>/<package>`.
static SERVER_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9.-]*[A-Za-z0-9]/[A-Za-z0-9][A-Za-z0-9._-]*[A-Za-z0-9]$")
        .expect("server name regex is valid")
});

static DOMAIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?(\.[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?)*$")
        .expect("domain regex is valid")
});

/// Validates a server name (`namespace/package`, reverse-DNS namespace).
pub fn validate_server_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::MissingName);
    }
    if name.len() > MAX_SERVER_NAME_LENGTH {
        return Err(ValidationError::NameTooLong(MAX_SERVER_NAME_LENGTH));
    }
    if !SERVER_NAME_RE.is_match(name) {
        return Err(ValidationError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Validates a DNS domain name (1..=253 chars, label grammar).
pub fn validate_domain(domain: &str) -> Result<(), ValidationError> {
    if domain.is_empty() || domain.len() > MAX_DOMAIN_LENGTH || !DOMAIN_RE.is_match(domain) {
        return Err(ValidationError::InvalidDomain(domain.to_string()));
    }
    Ok(())
}

/// Reverses a dotted domain: `registry.example.com` -> `com.example.registry`.
pub fn reverse_domain(domain: &str) -> String {
    let mut labels: Vec<&str> = domain.split('.').collect();
    labels.reverse();
    labels.join(".")
}

/// Returns the namespace segment of a server name (everything before `/`).
pub fn namespace_of(name: &str) -> Option<&str> {
    name.split_once('/').map(|(ns, _)| ns)
}
