//! Catalog storage and publish/edit orchestration for the MCP registry.
//!
//! The store persists versioned server records in Postgres; the service
//! layers the publish pipeline (advisory-lock serialization, latest
//! election, quota, duplicate detection) and the edit pipeline on top.

pub mod db;
pub mod error;
pub mod service;
pub mod store;
pub mod version;

pub use db::{create_pool, run_migrations};
pub use error::{CatalogError, Result};
pub use service::{RegistryService, MAX_VERSIONS_PER_SERVER};
pub use store::{publish_lock_key, CatalogStore, Cursor, ListFilter, DEFAULT_LIST_LIMIT};
pub use version::candidate_is_newer;
