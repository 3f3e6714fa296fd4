//! Structural validation for publisher-submitted server descriptors.

use crate::error::ValidationError;
use crate::model::ServerJson;
use crate::name::validate_server_name;
use url::Url;

/// Maximum allowed description length
pub const MAX_DESCRIPTION_LENGTH: usize = 100;

/// Maximum allowed version string length
pub const MAX_VERSION_LENGTH: usize = 255;

/// Validates the structural invariants of a submitted descriptor.
///
/// Upstream-package ownership is a separate, network-facing concern; this
/// only checks the shape the catalog is willing to store.
pub fn validate_server_json(server: &ServerJson) -> Result<(), ValidationError> {
    validate_server_name(&server.name)?;

    if server.description.is_empty() || server.description.chars().count() > MAX_DESCRIPTION_LENGTH
    {
        return Err(ValidationError::InvalidDescription);
    }

    if server.version.is_empty() {
        return Err(ValidationError::MissingVersion);
    }
    if server.version.len() > MAX_VERSION_LENGTH {
        return Err(ValidationError::VersionTooLong(MAX_VERSION_LENGTH));
    }

    for remote in &server.remotes {
        let parsed = Url::parse(&remote.url)
            .map_err(|_| ValidationError::InvalidRemoteUrl(remote.url.clone()))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ValidationError::InvalidRemoteUrl(remote.url.clone()));
        }
    }

    for package in &server.packages {
        if package.identifier.is_empty() {
            return Err(ValidationError::MissingPackageIdentifier);
        }
        if package.version.is_empty() {
            return Err(ValidationError::MissingPackageVersion);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base_server() -> ServerJson {
        serde_json::from_value(json!({
            "name": "io.example/server",
            "description": "An example server",
            "version": "1.0.0"
        }))
        .unwrap()
    }

    #[test]
    fn accepts_minimal_descriptor() {
        assert!(validate_server_json(&base_server()).is_ok());
    }

    #[test]
    fn rejects_bad_name() {
        let mut server = base_server();
        server.name = "not-a-server-name".to_string();
        assert!(matches!(
            validate_server_json(&server),
            Err(ValidationError::InvalidName(_))
        ));
    }

    #[test]
    fn rejects_empty_and_overlong_description() {
        let mut server = base_server();
        server.description = String::new();
        assert_eq!(
            validate_server_json(&server),
            Err(ValidationError::InvalidDescription)
        );

        server.description = "x".repeat(MAX_DESCRIPTION_LENGTH + 1);
        assert_eq!(
            validate_server_json(&server),
            Err(ValidationError::InvalidDescription)
        );
    }

    #[test]
    fn rejects_missing_version() {
        let mut server = base_server();
        server.version = String::new();
        assert_eq!(
            validate_server_json(&server),
            Err(ValidationError::MissingVersion)
        );
    }

    #[test]
    fn rejects_non_http_remote_url() {
        let mut server = base_server();
        server.remotes = serde_json::from_value(json!([
            {"type": "streamable-http", "url": "ftp://example.com/mcp"}
        ]))
        .unwrap();
        assert!(matches!(
            validate_server_json(&server),
            Err(ValidationError::InvalidRemoteUrl(_))
        ));
    }

    #[test]
    fn rejects_package_without_identifier() {
        let mut server = base_server();
        server.packages = serde_json::from_value(json!([
            {"registryType": "npm", "identifier": "", "version": "1.0.0"}
        ]))
        .unwrap();
        assert_eq!(
            validate_server_json(&server),
            Err(ValidationError::MissingPackageIdentifier)
        );
    }
}
