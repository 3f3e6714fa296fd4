use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use registry_auth::AuthError;
use registry_catalog::CatalogError;
use serde_json::json;

pub type ApiResult<T> = Result<T, ApiError>;

/// HTTP-surfaced error kinds with stable machine codes.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    QuotaExceeded(String),
    UpstreamValidation(String),
    Internal(String),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            ApiError::QuotaExceeded(_) => (StatusCode::TOO_MANY_REQUESTS, "quota_exceeded"),
            ApiError::UpstreamValidation(_) => (StatusCode::BAD_REQUEST, "upstream_validation_failed"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }

    fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(m)
            | ApiError::Unauthorized(m)
            | ApiError::Forbidden(m)
            | ApiError::NotFound(m)
            | ApiError::Conflict(m)
            | ApiError::QuotaExceeded(m)
            | ApiError::UpstreamValidation(m)
            | ApiError::Internal(m) => m,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self.message(), code = code, "Request failed");
        } else {
            tracing::debug!(error = %self.message(), code = code, "Request rejected");
        }

        let body = json!({
            "error": self.message(),
            "code": code,
            "timestamp": Utc::now().to_rfc3339(),
        });

        (status, Json(body)).into_response()
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(m) => ApiError::NotFound(format!("server not found: {m}")),
            CatalogError::InvalidInput(_)
            | CatalogError::InvalidCursor(_)
            | CatalogError::Validation(_)
            | CatalogError::DeletedIsTerminal => ApiError::BadRequest(err.to_string()),
            CatalogError::DuplicateVersion { .. } | CatalogError::DuplicateRemoteUrl { .. } => {
                ApiError::Conflict(err.to_string())
            }
            CatalogError::QuotaExceeded { .. } => ApiError::QuotaExceeded(err.to_string()),
            CatalogError::PackageValidation(e) => ApiError::UpstreamValidation(e.to_string()),
            CatalogError::Database(_) | CatalogError::Migration(_) | CatalogError::Serialization(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        // The verbose cause goes to the log, never to the caller.
        tracing::warn!(error = %err, "Authentication failed");
        let terse = match &err {
            AuthError::InvalidDomain(_) => "invalid domain",
            AuthError::InvalidTimestamp(_) => "invalid timestamp",
            AuthError::TimestampOutOfRange => "timestamp outside the allowed window",
            AuthError::MalformedSignature | AuthError::SignatureVerification => {
                "signature verification failed"
            }
            AuthError::NoAuthRecord(_) => "no auth record found",
            AuthError::ResponseTooLarge => "auth record response too large",
            AuthError::Dns(_) => "DNS lookup failed",
            AuthError::Http(_) => "auth record fetch failed",
            AuthError::Token(_) => "invalid or expired token",
            AuthError::MethodNotConfigured(_) => "auth method not enabled",
            AuthError::Upstream(_) => "identity provider unavailable",
            AuthError::MissingClaim(_) | AuthError::ClaimMismatch(_) => {
                "required claim missing or mismatched"
            }
        };
        ApiError::Unauthorized(terse.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_errors_map_to_stable_statuses() {
        let cases = [
            (CatalogError::NotFound("io.example/x".into()), StatusCode::NOT_FOUND),
            (CatalogError::InvalidInput("bad".into()), StatusCode::BAD_REQUEST),
            (CatalogError::DeletedIsTerminal, StatusCode::BAD_REQUEST),
            (
                CatalogError::DuplicateVersion {
                    name: "io.example/x".into(),
                    version: "1.0.0".into(),
                },
                StatusCode::CONFLICT,
            ),
            (
                CatalogError::QuotaExceeded {
                    name: "io.example/x".into(),
                    limit: 10_000,
                },
                StatusCode::TOO_MANY_REQUESTS,
            ),
        ];

        for (err, expected) in cases {
            let (status, _) = ApiError::from(err).status_and_code();
            assert_eq!(status, expected);
        }
    }

    #[test]
    fn auth_errors_flatten_to_unauthorized() {
        let api: ApiError = AuthError::SignatureVerification.into();
        let (status, code) = api.status_and_code();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(code, "unauthorized");
        // Terse cause only; no internal detail leaks.
        assert_eq!(api.message(), "signature verification failed");
    }
}
