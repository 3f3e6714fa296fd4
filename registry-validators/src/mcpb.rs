//! MCPB bundle validation.
//!
//! MCPB packages are direct download URLs with no queryable metadata
//! endpoint; the validator enforces an https identifier on a recognized
//! release host and a pinned `fileSha256` digest.

use crate::error::{Result, ValidatorError};
use registry_core::Package;
use url::Url;

const ALLOWED_HOSTS: &[&str] = &["github.com", "www.github.com", "gitlab.com", "www.gitlab.com"];

pub(crate) fn validate(package: &Package) -> Result<()> {
    let url = Url::parse(&package.identifier)
        .map_err(|_| ValidatorError::Mcpb(format!("identifier {} is not a URL", package.identifier)))?;

    if url.scheme() != "https" {
        return Err(ValidatorError::Mcpb(format!(
            "identifier {} must use https",
            package.identifier
        )));
    }

    let host = url.host_str().unwrap_or_default();
    if !ALLOWED_HOSTS.contains(&host) {
        return Err(ValidatorError::Mcpb(format!(
            "host {host} is not a recognized release host"
        )));
    }

    match package.file_sha256.as_deref() {
        Some(digest) if digest.len() == 64 && digest.chars().all(|c| c.is_ascii_hexdigit()) => {
            Ok(())
        }
        Some(_) => Err(ValidatorError::Mcpb(
            "fileSha256 must be a 64-character hex digest".to_string(),
        )),
        None => Err(ValidatorError::Mcpb(
            "fileSha256 is required for MCPB packages".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mcpb_package(identifier: &str, sha: Option<&str>) -> Package {
        serde_json::from_value(json!({
            "registryType": "mcpb",
            "identifier": identifier,
            "version": "1.0.0",
            "fileSha256": sha
        }))
        .unwrap()
    }

    #[test]
    fn accepts_github_release_with_digest() {
        let pkg = mcpb_package(
            "https://github.com/acme/server/releases/download/v1.0.0/server.mcpb",
            Some(&"ab".repeat(32)),
        );
        assert!(validate(&pkg).is_ok());
    }

    #[test]
    fn rejects_non_https_and_unknown_hosts() {
        let pkg = mcpb_package("http://github.com/acme/server.mcpb", Some(&"ab".repeat(32)));
        assert!(validate(&pkg).is_err());

        let pkg = mcpb_package("https://example.com/server.mcpb", Some(&"ab".repeat(32)));
        assert!(validate(&pkg).is_err());
    }

    #[test]
    fn rejects_missing_or_malformed_digest() {
        let pkg = mcpb_package("https://github.com/acme/server.mcpb", None);
        assert!(validate(&pkg).is_err());

        let pkg = mcpb_package("https://github.com/acme/server.mcpb", Some("nothex"));
        assert!(validate(&pkg).is_err());
    }
}
