//! Anonymous exchange, for development and test deployments only.

use registry_core::{Action, PermissionGrant};

/// Namespace anonymous tokens may publish and edit under.
pub const ANONYMOUS_NAMESPACE: &str = "io.modelcontextprotocol.anonymous";

/// Subject recorded for anonymous tokens.
pub const ANONYMOUS_SUBJECT: &str = "anonymous";

pub fn anonymous_grants() -> Vec<PermissionGrant> {
    vec![
        PermissionGrant::new(Action::Publish, format!("{ANONYMOUS_NAMESPACE}/*")),
        PermissionGrant::new(Action::Edit, format!("{ANONYMOUS_NAMESPACE}/*")),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use registry_core::grants_permission;

    #[test]
    fn grants_cover_only_the_anonymous_namespace() {
        let grants = anonymous_grants();
        assert!(grants_permission(
            &grants,
            Action::Publish,
            "io.modelcontextprotocol.anonymous/my-server"
        ));
        assert!(grants_permission(
            &grants,
            Action::Edit,
            "io.modelcontextprotocol.anonymous/my-server"
        ));
        assert!(!grants_permission(&grants, Action::Publish, "io.example/server"));
    }
}
