//! PyPI ownership validation.
//!
//! The project metadata for the submitted release must carry an
//! `mcp-name: <server name>` declaration in its description.

use crate::error::{Result, ValidatorError};
use crate::fetch::{contains_mcp_name_declaration, read_json};
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
        "{}/pypi/{}/{}/json",
        base_url, package.identifier, package.version
    );
    debug!(url = %url, "Fetching PyPI release metadata");

    let response = client
        .get(&url)
        .header("Accept", "application/json")
        .send()
        .await
        .map_err(|e| ValidatorError::Upstream(e.to_string()))?;

    if response.status() == reqwest::StatusCode::NOT_FOUND {
        return Err(ValidatorError::NotFound(format!(
            "PyPI package {}=={} does not exist",
            package.identifier, package.version
        )));
    }
    if !response.status().is_success() {
        return Err(ValidatorError::Upstream(format!(
            "PyPI returned {} for {}",
            response.status(),
            url
        )));
    }

    let doc = read_json(response).await?;
    let description = doc
        .pointer("/info/description")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    let summary = doc
        .pointer("/info/summary")
        .and_then(|v| v.as_str())
        .unwrap_or_default();

    if contains_mcp_name_declaration(description, server_name)
        || contains_mcp_name_declaration(summary, server_name)
    {
        Ok(())
    } else {
        Err(ValidatorError::PypiOwnership(format!(
            "package {}=={} does not declare mcp-name: {server_name}",
            package.identifier, package.version
        )))
    }
}
