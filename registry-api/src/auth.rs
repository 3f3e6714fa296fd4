//! Bearer-token extraction and permission enforcement.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use registry_auth::CapabilityClaims;
use registry_core::{grants_permission, patterns_for_action, Action};

/// Verified capability-token claims for the requesting publisher.
///
/// Extracting this fails with 401 when the Authorization header is missing,
/// malformed, or carries an invalid or expired token.
pub struct Publisher(pub CapabilityClaims);

impl FromRequestParts<AppState> for Publisher {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("missing Authorization header".to_string()))?;

        let token = header.strip_prefix("Bearer ").ok_or_else(|| {
            ApiError::Unauthorized("Authorization header must be a bearer token".to_string())
        })?;

        let claims = state.signer.verify(token)?;
        Ok(Publisher(claims))
    }
}

/// Requires a grant covering `resource`, or fails with 403 naming the
/// attempted resource and the patterns the token actually holds.
pub fn require_permission(
    claims: &CapabilityClaims,
    action: Action,
    resource: &str,
) -> Result<(), ApiError> {
    if grants_permission(&claims.permissions, action, resource) {
        return Ok(());
    }

    let held = patterns_for_action(&claims.permissions, action);
    Err(ApiError::Forbidden(format!(
        "token does not grant {action} on {resource}; granted {action} patterns: [{}]",
        held.join(", ")
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use registry_auth::{AuthMethod, CapabilityClaims};
    use registry_core::PermissionGrant;

    fn claims(patterns: &[&str]) -> CapabilityClaims {
        CapabilityClaims {
            auth_method: AuthMethod::Dns,
            sub: "dns:example.com".to_string(),
            permissions: patterns
                .iter()
                .map(|p| PermissionGrant::new(Action::Publish, *p))
                .collect(),
            iat: 0,
            exp: i64::MAX,
        }
    }

    #[test]
    fn denial_names_resource_and_held_patterns() {
        let claims = claims(&["com.example/*", "com.example.*"]);
        let err = require_permission(&claims, Action::Publish, "com.other/pkg").unwrap_err();
        let message = format!("{err:?}");
        assert!(message.contains("com.other/pkg"));
        assert!(message.contains("com.example/*"));
        assert!(message.contains("com.example.*"));
    }

    #[test]
    fn matching_grant_passes() {
        let claims = claims(&["com.example/*"]);
        assert!(require_permission(&claims, Action::Publish, "com.example/pkg").is_ok());
        assert!(require_permission(&claims, Action::Edit, "com.example/pkg").is_err());
    }
}
