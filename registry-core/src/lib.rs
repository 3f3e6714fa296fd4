//! Shared model and validation foundation for the MCP server registry.
//!
//! Contains the `server.json` descriptor types, server-name and domain
//! validation, the reverse-DNS helper, and the permission grant model used
//! by capability tokens.

pub mod error;
pub mod model;
pub mod name;
pub mod permission;
pub mod validate;

pub use error::ValidationError;
pub use model::{
    Argument, KeyValueInput, Package, RegistryMeta, RegistryType, Remote, Repository,
    ServerJson, ServerRecord, ServerStatus, Transport, OFFICIAL_META_KEY, PUBLISHER_META_KEY,
};
pub use name::{namespace_of, reverse_domain, validate_domain, validate_server_name};
pub use permission::{grants_permission, patterns_for_action, Action, PermissionGrant};
pub use validate::validate_server_json;
