//! Permission grants carried by capability tokens and their match rules.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Actions a capability token can authorize on a server name.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Publish,
    Edit,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Publish => f.write_str("publish"),
            Action::Edit => f.write_str("edit"),
        }
    }
}

/// One `(action, resource pattern)` pair.
///
/// Patterns are matched against server names. Three forms exist: a literal
/// name, a suffix wildcard `prefix/*`, and a subdomain wildcard `prefix.*`
/// covering `prefix.<anything>` at any depth.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PermissionGrant {
    pub action: Action,
    pub resource_pattern: String,
}

impl PermissionGrant {
    pub fn new(action: Action, resource_pattern: impl Into<String>) -> Self {
        Self {
            action,
            resource_pattern: resource_pattern.into(),
        }
    }

    /// Whether this grant authorizes `action` on `resource`.
    pub fn matches(&self, action: Action, resource: &str) -> bool {
        if self.action != action {
            return false;
        }
        let pattern = self.resource_pattern.as_str();
        if let Some(base) = pattern.strip_suffix("/*") {
            resource == base || resource.strip_prefix(base).is_some_and(|r| r.starts_with('/'))
        } else if let Some(base) = pattern.strip_suffix(".*") {
            resource.strip_prefix(base).is_some_and(|r| r.starts_with('.'))
        } else {
            resource == pattern
        }
    }
}

/// Whether any grant in `permissions` authorizes `action` on `resource`.
pub fn grants_permission(permissions: &[PermissionGrant], action: Action, resource: &str) -> bool {
    permissions.iter().any(|g| g.matches(action, resource))
}

/// The resource patterns held for `action`, for permission-denied messages.
pub fn patterns_for_action(permissions: &[PermissionGrant], action: Action) -> Vec<String> {
    permissions
        .iter()
        .filter(|g| g.action == action)
        .map(|g| g.resource_pattern.clone())
        .collect()
}
