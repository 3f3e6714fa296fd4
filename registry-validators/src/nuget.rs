//! NuGet ownership validation.
//!
//! The package readme served by the flat-container API must carry an
//! `mcp-name: <server name>` declaration.

use crate::error::{Result, ValidatorError};
use crate::fetch::{contains_mcp_name_declaration, read_bounded, MAX_METADATA_BYTES};
use registry_core::Package;
use reqwest::Client;
use tracing::debug;

pub(crate) async fn validate(
    client: &Client,
    base_url: &str,
    server_name: &str,
    package: &Package,
) -> Result<()> {
    let url = format!(
        "{}/v3-flatcontainer/{}/{}/readme",
        base_url,
        package.identifier.to_lowercase(),
        package.version.to_lowercase()
    );
    debug!(url = %url, "Fetching NuGet package readme");

    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| ValidatorError::Upstream(e.to_string()))?;

    if response.status() == reqwest::StatusCode::NOT_FOUND {
        return Err(ValidatorError::NugetOwnership(format!(
            "package {} {} has no readme declaring mcp-name",
            package.identifier, package.version
        )));
    }
    if !response.status().is_success() {
        return Err(ValidatorError::Upstream(format!(
            "NuGet returned {} for {}",
            response.status(),
            url
        )));
    }

    let body = read_bounded(response, MAX_METADATA_BYTES).await?;
    let readme = String::from_utf8_lossy(&body);
    if contains_mcp_name_declaration(&readme, server_name) {
        Ok(())
    } else {
        Err(ValidatorError::NugetOwnership(format!(
            "package {} {} does not declare mcp-name: {server_name}",
            package.identifier, package.version
        )))
    }
}
