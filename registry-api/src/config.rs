use std::collections::HashMap;

/// Environment-driven configuration, prefix `MCP_REGISTRY_`.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub database_url: String,
    /// Hex-encoded 32-byte capability-token signing key. Required.
    pub jwt_secret_hex: Option<String>,
    pub enable_anonymous_auth: bool,
    pub enable_registry_validation: bool,
    /// OIDC audience for the GitHub exchanges.
    pub github_client_id: Option<String>,
    pub oidc_issuer: Option<String>,
    pub oidc_client_id: Option<String>,
    pub oidc_extra_claims: HashMap<String, String>,
    /// Comma-separated publish resource patterns for generic OIDC tokens.
    pub oidc_publish_permissions: Option<String>,
    /// Comma-separated edit resource patterns for generic OIDC tokens.
    pub oidc_edit_permissions: Option<String>,
}

fn default_bind_addr() -> String {
    std::env::var("MCP_REGISTRY_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
}

fn default_database_url() -> String {
    std::env::var("MCP_REGISTRY_DATABASE_URL")
        .unwrap_or_else(|_| "postgres://localhost/mcp_registry".to_string())
}

fn env_flag(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(raw) => matches!(raw.to_lowercase().as_str(), "1" | "true" | "yes"),
        Err(_) => default,
    }
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn extra_claims_from_env() -> HashMap<String, String> {
    let Some(raw) = env_opt("MCP_REGISTRY_OIDC_EXTRA_CLAIMS") else {
        return HashMap::new();
    };
    match serde_json::from_str(&raw) {
        Ok(claims) => claims,
        Err(err) => {
            tracing::warn!(error = %err, "MCP_REGISTRY_OIDC_EXTRA_CLAIMS is not a JSON object, ignoring");
            HashMap::new()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            database_url: default_database_url(),
            jwt_secret_hex: env_opt("MCP_REGISTRY_JWT_SECRET"),
            enable_anonymous_auth: env_flag("MCP_REGISTRY_ENABLE_ANONYMOUS_AUTH", false),
            enable_registry_validation: env_flag("MCP_REGISTRY_ENABLE_REGISTRY_VALIDATION", true),
            github_client_id: env_opt("MCP_REGISTRY_GITHUB_CLIENT_ID"),
            oidc_issuer: env_opt("MCP_REGISTRY_OIDC_ISSUER"),
            oidc_client_id: env_opt("MCP_REGISTRY_OIDC_CLIENT_ID"),
            oidc_extra_claims: extra_claims_from_env(),
            oidc_publish_permissions: env_opt("MCP_REGISTRY_OIDC_PUBLISH_PERMISSIONS"),
            oidc_edit_permissions: env_opt("MCP_REGISTRY_OIDC_EDIT_PERMISSIONS"),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}
