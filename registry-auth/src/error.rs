use thiserror::Error;

pub type Result<T> = std::result::Result<T, AuthError>;

/// Failures across the token exchange methods.
///
/// The HTTP layer flattens every variant to `Unauthorized` with a terse
/// cause; the verbose cause stays in the logs.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("invalid domain: {0}")]
    InvalidDomain(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("timestamp is outside the allowed clock skew")]
    TimestampOutOfRange,

    #[error("signature is not a hex-encoded Ed25519 signature")]
    MalformedSignature,

    #[error("signature verification failed")]
    SignatureVerification,

    #[error("no MCP auth record found for {0}")]
    NoAuthRecord(String),

    #[error("auth record response is too large")]
    ResponseTooLarge,

    #[error("DNS lookup failed: {0}")]
    Dns(String),

    #[error("HTTP fetch failed: {0}")]
    Http(String),

    #[error("invalid token: {0}")]
    Token(String),

    #[error("auth method {0} is not configured")]
    MethodNotConfigured(&'static str),

    #[error("upstream identity provider error: {0}")]
    Upstream(String),

    #[error("missing claim {0}")]
    MissingClaim(String),

    #[error("claim {0} does not match the required value")]
    ClaimMismatch(String),
}
