//! Upstream package ownership validators.
//!
//! Before a server descriptor is accepted, every referenced package must
//! prove that the upstream artifact declares the claimed MCP server name.
//! Each registry type has its own ownership signal; dispatch happens here.

pub mod error;
mod fetch;
mod mcpb;
mod npm;
mod nuget;
mod oci;
mod pypi;

pub use error::{Result, ValidatorError};
pub use oci::{OciRegistry, SERVER_NAME_LABEL};

use registry_core::{Package, RegistryType, ServerJson};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

const USER_AGENT: &str = concat!("mcp-registry/", env!("CARGO_PKG_VERSION"));

/// Connection settings and pinned base URLs for the upstream registries.
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Whether ownership validation runs at all.
    pub enabled: bool,
    /// Base URL for the npm registry API.
    pub npm_base_url: String,
    /// Base URL for the PyPI JSON API.
    pub pypi_base_url: String,
    /// Base URL for the NuGet flat-container API.
    pub nuget_base_url: String,
    /// OCI registries the validator can resolve images from.
    pub oci_registries: Vec<OciRegistry>,
    /// HTTP request timeout for upstream calls.
    pub timeout: Duration,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            npm_base_url: "https://registry.npmjs.org".to_string(),
            pypi_base_url: "https://pypi.org".to_string(),
            nuget_base_url: "https://api.nuget.org".to_string(),
            oci_registries: vec![OciRegistry::docker_io(), OciRegistry::ghcr_io()],
            timeout: Duration::from_secs(10),
        }
    }
}

/// Validator dispatch over the closed set of registry types.
///
/// Holds one HTTP client; validators share no other state and can run
/// concurrently for independent packages.
pub struct PackageValidators {
    config: ValidatorConfig,
    client: Client,
}

impl PackageValidators {
    pub fn new(config: ValidatorConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ValidatorError::Upstream(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    /// Proves ownership for every package referenced by `server`.
    pub async fn validate(&self, server: &ServerJson) -> Result<()> {
        if !self.config.enabled {
            debug!(name = %server.name, "Registry validation disabled, skipping");
            return Ok(());
        }

        for package in &server.packages {
            self.validate_package(&server.name, package).await?;
            info!(
                name = %server.name,
                registry_type = %package.registry_type,
                identifier = %package.identifier,
                "Package ownership verified"
            );
        }
        Ok(())
    }

    async fn validate_package(&self, server_name: &str, package: &Package) -> Result<()> {
        if package.identifier.is_empty() {
            return Err(ValidatorError::MissingIdentifier);
        }
        if package.version.is_empty() {
            return Err(ValidatorError::MissingVersion);
        }

        match package.registry_type {
            RegistryType::Npm => {
                let base = self.pinned_base(package, &self.config.npm_base_url)?;
                npm::validate(&self.client, base, server_name, package).await
            }
            RegistryType::Pypi => {
                let base = self.pinned_base(package, &self.config.pypi_base_url)?;
                pypi::validate(&self.client, base, server_name, package).await
            }
            RegistryType::Nuget => {
                let base = self.pinned_base(package, &self.config.nuget_base_url)?;
                nuget::validate(&self.client, base, server_name, package).await
            }
            RegistryType::Oci => {
                let registry = self.resolve_oci_registry(package)?;
                oci::validate(&self.client, registry, server_name, package).await
            }
            RegistryType::Mcpb => {
                if let Some(url) = &package.registry_base_url {
                    return Err(ValidatorError::MismatchedRegistryTypeAndUrl {
                        registry_type: package.registry_type.to_string(),
                        url: url.clone(),
                    });
                }
                mcpb::validate(package)
            }
        }
    }

    /// A submitted `registryBaseUrl` must equal the pinned URL for its type.
    fn pinned_base<'a>(&self, package: &Package, pinned: &'a str) -> Result<&'a str> {
        if let Some(submitted) = &package.registry_base_url {
            if submitted.trim_end_matches('/') != pinned.trim_end_matches('/') {
                return Err(ValidatorError::MismatchedRegistryTypeAndUrl {
                    registry_type: package.registry_type.to_string(),
                    url: submitted.clone(),
                });
            }
        }
        Ok(pinned)
    }

    fn resolve_oci_registry(&self, package: &Package) -> Result<&OciRegistry> {
        match &package.registry_base_url {
            None => self
                .config
                .oci_registries
                .first()
                .ok_or_else(|| ValidatorError::Upstream("no OCI registries configured".to_string())),
            Some(submitted) => self
                .config
                .oci_registries
                .iter()
                .find(|r| r.base_url.trim_end_matches('/') == submitted.trim_end_matches('/'))
                .ok_or_else(|| ValidatorError::MismatchedRegistryTypeAndUrl {
                    registry_type: package.registry_type.to_string(),
                    url: submitted.clone(),
                }),
        }
    }
}
