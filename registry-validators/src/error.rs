use thiserror::Error;

pub type Result<T> = std::result::Result<T, ValidatorError>;

/// Failures proving upstream ownership of a submitted package.
#[derive(Error, Debug)]
pub enum ValidatorError {
    #[error("package identifier is required")]
    MissingIdentifier,

    #[error("package version is required")]
    MissingVersion,

    #[error("registry type {registry_type} does not serve base URL {url}")]
    MismatchedRegistryTypeAndUrl { registry_type: String, url: String },

    #[error("NPM package ownership validation failed: {0}")]
    NpmOwnership(String),

    #[error("PyPI package ownership validation failed: {0}")]
    PypiOwnership(String),

    #[error("NuGet package ownership validation failed: {0}")]
    NugetOwnership(String),

    #[error("OCI image ownership validation failed: {0}")]
    OciOwnership(String),

    #[error("MCPB package validation failed: {0}")]
    Mcpb(String),

    #[error("package not found upstream: {0}")]
    NotFound(String),

    #[error("upstream registry request failed: {0}")]
    Upstream(String),
}
