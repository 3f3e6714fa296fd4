use crate::config::Config;
use anyhow::Context;
use registry_auth::{
    AuthMethod, DnsRecordSource, DomainAuth, GenericOidcAuth, GithubAuth, OidcConfig,
    OidcVerifier, TokenSigner, WellKnownRecordSource,
};
use registry_catalog::{CatalogStore, RegistryService};
use registry_validators::{PackageValidators, ValidatorConfig};
use sqlx::PgPool;
use std::sync::Arc;

/// Configured token exchange methods.
pub struct AuthMethods {
    pub dns: DomainAuth,
    pub http: DomainAuth,
    pub github: GithubAuth,
    pub oidc: Option<GenericOidcAuth>,
    pub anonymous_enabled: bool,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RegistryService>,
    pub store: CatalogStore,
    pub signer: Arc<TokenSigner>,
    pub auth: Arc<AuthMethods>,
}

impl AppState {
    pub fn new(pool: PgPool, config: &Config) -> anyhow::Result<Self> {
        let secret = config
            .jwt_secret_hex
            .as_deref()
            .context("MCP_REGISTRY_JWT_SECRET must be set")?;
        let signer = TokenSigner::from_hex(secret)?;

        let validators = PackageValidators::new(ValidatorConfig {
            enabled: config.enable_registry_validation,
            ..ValidatorConfig::default()
        })?;

        let store = CatalogStore::new(pool);
        let service = RegistryService::new(store.clone(), Arc::new(validators));

        let dns = DomainAuth::new(AuthMethod::Dns, Box::new(DnsRecordSource::new()), true);
        let http = DomainAuth::new(
            AuthMethod::Http,
            Box::new(WellKnownRecordSource::new()?),
            false,
        );
        let github = GithubAuth::new(config.github_client_id.clone())?;

        let oidc = match (&config.oidc_issuer, &config.oidc_client_id) {
            (Some(issuer), Some(client_id)) => {
                let verifier = OidcVerifier::new(OidcConfig {
                    issuer: issuer.clone(),
                    client_id: client_id.clone(),
                    extra_claims: config.oidc_extra_claims.clone(),
                })?;
                Some(GenericOidcAuth::new(
                    verifier,
                    config
                        .oidc_publish_permissions
                        .as_deref()
                        .map(GenericOidcAuth::parse_patterns)
                        .unwrap_or_default(),
                    config
                        .oidc_edit_permissions
                        .as_deref()
                        .map(GenericOidcAuth::parse_patterns)
                        .unwrap_or_default(),
                ))
            }
            _ => None,
        };

        Ok(Self {
            service: Arc::new(service),
            store,
            signer: Arc::new(signer),
            auth: Arc::new(AuthMethods {
                dns,
                http,
                github,
                oidc,
                anonymous_enabled: config.enable_anonymous_auth,
            }),
        })
    }
}
