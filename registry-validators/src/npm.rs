//! npm ownership validation.
//!
//! The published version document on the npm registry must carry an
//! `mcpName` field equal to the submitted server name.

use crate::error::{Result, ValidatorError};
use crate::fetch::read_json;
use registry_core::Package;
use reqwest::Client;
use tracing::debug;

pub(crate) async fn validate(
    client: &Client,
    base_url: &str,
    server_name: &str,
    package: &Package,
) -> Result<()> {
    let url = format!("{}/{}/{}", base_url, package.identifier, package.version);
    debug!(url = %url, "Fetching npm version document");

    let response = client
        .get(&url)
        .header("Accept", "application/json")
        .send()
        .await
        .map_err(|e| ValidatorError::Upstream(e.to_string()))?;

    if response.status() == reqwest::StatusCode::NOT_FOUND {
        return Err(ValidatorError::NotFound(format!(
            "npm package {}@{} does not exist",
            package.identifier, package.version
        )));
    }
    if !response.status().is_success() {
        return Err(ValidatorError::Upstream(format!(
            "npm registry returned {} for {}",
            response.status(),
            url
        )));
    }

    let doc = read_json(response).await?;
    match doc.get("mcpName").and_then(|v| v.as_str()) {
        Some(declared) if declared == server_name => Ok(()),
        Some(declared) => Err(ValidatorError::NpmOwnership(format!(
            "package {}@{} declares mcpName {declared:?}, expected {server_name:?}",
            package.identifier, package.version
        ))),
        None => Err(ValidatorError::NpmOwnership(format!(
            "package {}@{} does not declare an mcpName field",
            package.identifier, package.version
        ))),
    }
}
