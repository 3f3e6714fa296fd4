//! `server.json` descriptor types and registry-managed metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// `_meta` key owned by the registry; attached on reads, ignored on writes.
pub const OFFICIAL_META_KEY: &str = "io.modelcontextprotocol.registry/official";

/// `_meta` key reserved for opaque publisher extensions; preserved losslessly.
pub const PUBLISHER_META_KEY: &str = "io.modelcontextprotocol.registry/publisher-provided";

/// A publisher-submitted MCP server descriptor.
///
/// The composite natural key is `(name, version)`. Registry-managed state
/// (status, timestamps, latest flag) lives in [`RegistryMeta`], never here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServerJson {
    #[serde(rename = "$schema", default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    pub name: String,
    pub description: String,
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<Repository>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<Package>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remotes: Vec<Remote>,

    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
}

impl ServerJson {
    /// Drops the registry-owned `_meta` block from a submitted payload.
    ///
    /// Publisher-provided extensions are kept; an emptied `_meta` map is
    /// collapsed to `None` so stored JSON stays canonical.
    pub fn strip_registry_meta(&mut self) {
        if let Some(meta) = self.meta.as_mut() {
            meta.remove(OFFICIAL_META_KEY);
            if meta.is_empty() {
                self.meta = None;
            }
        }
    }
}

/// Source-repository reference for a server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    pub url: String,
    pub source: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subfolder: Option<String>,
}

/// Upstream registries a package can be published to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RegistryType {
    Npm,
    Pypi,
    Oci,
    Nuget,
    Mcpb,
}

impl fmt::Display for RegistryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RegistryType::Npm => "npm",
            RegistryType::Pypi => "pypi",
            RegistryType::Oci => "oci",
            RegistryType::Nuget => "nuget",
            RegistryType::Mcpb => "mcpb",
        };
        f.write_str(s)
    }
}

/// A package artifact reference in an upstream registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    pub registry_type: RegistryType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_base_url: Option<String>,

    pub identifier: String,
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_sha256: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_hint: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub runtime_arguments: Vec<Argument>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub package_arguments: Vec<Argument>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environment_variables: Vec<KeyValueInput>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<Transport>,
}

/// A command-line argument declaration for a package runtime.
///
/// Publisher schemas evolve faster than the registry; unknown keys are kept
/// in `extra` so the payload round-trips losslessly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Argument {
    #[serde(rename = "type")]
    pub arg_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_hint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_required: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_repeated: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A named input, used for environment variables and transport headers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KeyValueInput {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_required: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_secret: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// How a packaged server speaks MCP once launched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transport {
    #[serde(rename = "type")]
    pub transport_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<KeyValueInput>,
}

/// A remotely-hosted MCP endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Remote {
    #[serde(rename = "type")]
    pub transport_type: String,

    pub url: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<KeyValueInput>,
}

/// Lifecycle status of a stored server version. `Deleted` is terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Active,
    Deprecated,
    Deleted,
}

impl ServerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerStatus::Active => "active",
            ServerStatus::Deprecated => "deprecated",
            ServerStatus::Deleted => "deleted",
        }
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServerStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ServerStatus::Active),
            "deprecated" => Ok(ServerStatus::Deprecated),
            "deleted" => Ok(ServerStatus::Deleted),
            other => Err(format!("invalid status: {other}")),
        }
    }
}

/// Registry-managed metadata for one stored server version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RegistryMeta {
    pub server_id: Uuid,
    pub status: ServerStatus,

    #[serde(serialize_with = "serialize_datetime")]
    pub published_at: DateTime<Utc>,

    #[serde(serialize_with = "serialize_datetime")]
    pub updated_at: DateTime<Utc>,

    pub is_latest: bool,
}

/// A stored server version: publisher payload plus registry metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerRecord {
    pub server: ServerJson,
    pub meta: RegistryMeta,
}

impl ServerRecord {
    /// Builds the wire form of this record: the descriptor with the official
    /// registry metadata embedded under `_meta`.
    pub fn to_wire(&self) -> ServerJson {
        let mut server = self.server.clone();
        let mut meta = server.meta.take().unwrap_or_default();
        if let Ok(official) = serde_json::to_value(&self.meta) {
            meta.insert(OFFICIAL_META_KEY.to_string(), official);
        }
        server.meta = Some(meta);
        server
    }
}

// Serialize DateTime as RFC 3339 / ISO 8601 string
fn serialize_datetime<S>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&dt.to_rfc3339())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn descriptor_round_trips_unknown_argument_keys() {
        let payload = json!({
            "name": "io.example/server",
            "description": "An example server",
            "version": "1.0.0",
            "packages": [{
                "registryType": "npm",
                "identifier": "example-server",
                "version": "1.0.0",
                "runtimeArguments": [{
                    "type": "named",
                    "name": "--port",
                    "futureField": {"nested": true}
                }]
            }]
        });

        let server: ServerJson = serde_json::from_value(payload.clone()).unwrap();
        let arg = &server.packages[0].runtime_arguments[0];
        assert_eq!(arg.arg_type, "named");
        assert_eq!(arg.extra["futureField"], json!({"nested": true}));

        let back = serde_json::to_value(&server).unwrap();
        assert_eq!(
            back["packages"][0]["runtimeArguments"][0]["futureField"],
            json!({"nested": true})
        );
    }

    #[test]
    fn strip_registry_meta_keeps_publisher_extensions() {
        let mut server: ServerJson = serde_json::from_value(json!({
            "name": "io.example/server",
            "description": "d",
            "version": "1.0.0",
            "_meta": {
                OFFICIAL_META_KEY: {"isLatest": true},
                PUBLISHER_META_KEY: {"build": 7}
            }
        }))
        .unwrap();

        server.strip_registry_meta();

        let meta = server.meta.unwrap();
        assert!(!meta.contains_key(OFFICIAL_META_KEY));
        assert_eq!(meta[PUBLISHER_META_KEY], json!({"build": 7}));
    }

    #[test]
    fn strip_registry_meta_collapses_empty_meta() {
        let mut server: ServerJson = serde_json::from_value(json!({
            "name": "io.example/server",
            "description": "d",
            "version": "1.0.0",
            "_meta": { OFFICIAL_META_KEY: {"isLatest": true} }
        }))
        .unwrap();

        server.strip_registry_meta();
        assert!(server.meta.is_none());
    }

    #[test]
    fn wire_form_embeds_official_meta() {
        let record = ServerRecord {
            server: serde_json::from_value(json!({
                "name": "io.example/server",
                "description": "d",
                "version": "1.0.0"
            }))
            .unwrap(),
            meta: RegistryMeta {
                server_id: Uuid::nil(),
                status: ServerStatus::Active,
                published_at: Utc::now(),
                updated_at: Utc::now(),
                is_latest: true,
            },
        };

        let wire = serde_json::to_value(record.to_wire()).unwrap();
        assert_eq!(wire["_meta"][OFFICIAL_META_KEY]["status"], "active");
        assert_eq!(wire["_meta"][OFFICIAL_META_KEY]["isLatest"], json!(true));
    }

    #[test]
    fn status_parses_and_rejects() {
        assert_eq!("active".parse::<ServerStatus>().unwrap(), ServerStatus::Active);
        assert_eq!(
            "deprecated".parse::<ServerStatus>().unwrap(),
            ServerStatus::Deprecated
        );
        assert_eq!("deleted".parse::<ServerStatus>().unwrap(), ServerStatus::Deleted);
        assert!("archived".parse::<ServerStatus>().is_err());
    }
}
