use thiserror::Error;

pub type Result<T> = std::result::Result<T, CatalogError>;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("server not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("version {version} of {name} is already published")]
    DuplicateVersion { name: String, version: String },

    #[error("remote URL {url} is already used by {name}")]
    DuplicateRemoteUrl { url: String, name: String },

    #[error("server {name} has reached the limit of {limit} versions")]
    QuotaExceeded { name: String, limit: i64 },

    #[error("Cannot change status of deleted server")]
    DeletedIsTerminal,

    #[error(transparent)]
    Validation(#[from] registry_core::ValidationError),

    #[error(transparent)]
    PackageValidation(#[from] registry_validators::ValidatorError),
}
