use thiserror::Error;

/// Structural validation failures for publisher-submitted payloads.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("server name is required")]
    MissingName,

    #[error("invalid server name format: {0}")]
    InvalidName(String),

    #[error("server name must be at most {0} characters")]
    NameTooLong(usize),

    #[error("invalid domain format: {0}")]
    InvalidDomain(String),

    #[error("description must be between 1 and 100 characters")]
    InvalidDescription,

    #[error("server version is required")]
    MissingVersion,

    #[error("server version must be at most {0} characters")]
    VersionTooLong(usize),

    #[error("invalid remote URL: {0}")]
    InvalidRemoteUrl(String),

    #[error("package identifier is required")]
    MissingPackageIdentifier,

    #[error("package version is required")]
    MissingPackageVersion,
}
