//! Publish/edit orchestration over the catalog store.

use crate::error::{CatalogError, Result};
use crate::store::CatalogStore;
use crate::version::candidate_is_newer;
use chrono::Utc;
use registry_core::{validate_server_json, RegistryMeta, ServerJson, ServerRecord, ServerStatus};
use registry_validators::PackageValidators;
use sqlx::postgres::Postgres;
use sqlx::Transaction;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Per-name cap on stored versions.
pub const MAX_VERSIONS_PER_SERVER: i64 = 10_000;

/// Rollback gets its own deadline so cleanup runs even when the request's
/// deadline has already passed.
const ROLLBACK_TIMEOUT: Duration = Duration::from_secs(1);

pub struct RegistryService {
    store: CatalogStore,
    validators: Arc<PackageValidators>,
}

impl RegistryService {
    pub fn new(store: CatalogStore, validators: Arc<PackageValidators>) -> Self {
        Self { store, validators }
    }

    pub fn store(&self) -> &CatalogStore {
        &self.store
    }

    /// Publish a new server version.
    ///
    /// Structural and upstream-ownership validation run before the
    /// transaction so network calls never hold the advisory lock; everything
    /// that decides or mutates catalog state runs inside one transaction,
    /// serialized per name by the lock.
    #[instrument(skip(self, server), fields(name = %server.name, version = %server.version))]
    pub async fn publish(&self, mut server: ServerJson) -> Result<ServerRecord> {
        validate_server_json(&server)?;
        server.strip_registry_meta();
        self.validators.validate(&server).await?;

        let mut tx = self.store.begin().await?;
        match self.publish_in_tx(&mut tx, &server).await {
            Ok(record) => {
                tx.commit().await?;
                info!(is_latest = record.meta.is_latest, "Published server version");
                Ok(record)
            }
            Err(err) => {
                rollback_with_deadline(tx).await;
                Err(err)
            }
        }
    }

    async fn publish_in_tx(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        server: &ServerJson,
    ) -> Result<ServerRecord> {
        self.store.acquire_publish_lock(&mut *tx, &server.name).await?;

        let urls: Vec<String> = server.remotes.iter().map(|r| r.url.clone()).collect();
        if let Some((url, owner)) = self
            .store
            .find_remote_conflict(&mut *tx, &server.name, &urls)
            .await?
        {
            return Err(CatalogError::DuplicateRemoteUrl { url, name: owner });
        }

        let existing = self.store.all_versions(&mut *tx, &server.name).await?;
        if existing.len() as i64 >= MAX_VERSIONS_PER_SERVER {
            return Err(CatalogError::QuotaExceeded {
                name: server.name.clone(),
                limit: MAX_VERSIONS_PER_SERVER,
            });
        }
        if existing.iter().any(|r| r.server.version == server.version) {
            return Err(CatalogError::DuplicateVersion {
                name: server.name.clone(),
                version: server.version.clone(),
            });
        }

        let now = Utc::now();
        let current_latest = existing.iter().find(|r| r.meta.is_latest);
        let is_latest = match current_latest {
            None => true,
            Some(current) => candidate_is_newer(
                &server.version,
                now,
                &current.server.version,
                current.meta.published_at,
            ),
        };

        // Flip the old latest row before inserting the new one; the partial
        // unique index forbids two latest rows at any instant.
        if is_latest && current_latest.is_some() {
            self.store.unmark_as_latest(&mut *tx, &server.name).await?;
        }

        let meta = RegistryMeta {
            server_id: Uuid::new_v4(),
            status: ServerStatus::Active,
            published_at: now,
            updated_at: now,
            is_latest,
        };
        self.store.create(&mut *tx, server, &meta).await
    }

    /// Edit the content fields and optionally the status of an existing
    /// version. No rename, no version rewrite, no un-delete.
    #[instrument(skip(self, server), fields(name = %name, version = %version))]
    pub async fn edit(
        &self,
        name: &str,
        version: &str,
        mut server: ServerJson,
        new_status: Option<ServerStatus>,
    ) -> Result<ServerRecord> {
        if server.name != name {
            return Err(CatalogError::InvalidInput(format!(
                "server name {} in body does not match {name} in path",
                server.name
            )));
        }
        if server.version != version {
            return Err(CatalogError::InvalidInput(format!(
                "server version {} in body does not match {version} in path",
                server.version
            )));
        }
        validate_server_json(&server)?;
        server.strip_registry_meta();

        let current = self.store.get_by_name_and_version(name, version).await?;
        let currently_deleted = current.meta.status == ServerStatus::Deleted;
        if currently_deleted && new_status.is_some_and(|s| s != ServerStatus::Deleted) {
            return Err(CatalogError::DeletedIsTerminal);
        }

        // Upstream ownership is not re-proven for tombstoned records.
        let target_deleted = currently_deleted || new_status == Some(ServerStatus::Deleted);
        if !target_deleted {
            self.validators.validate(&server).await?;
        }

        let mut tx = self.store.begin().await?;
        match self
            .edit_in_tx(&mut tx, name, version, &server, new_status)
            .await
        {
            Ok(record) => {
                tx.commit().await?;
                info!(status = %record.meta.status, "Edited server version");
                Ok(record)
            }
            Err(err) => {
                rollback_with_deadline(tx).await;
                Err(err)
            }
        }
    }

    async fn edit_in_tx(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        name: &str,
        version: &str,
        server: &ServerJson,
        new_status: Option<ServerStatus>,
    ) -> Result<ServerRecord> {
        let urls: Vec<String> = server.remotes.iter().map(|r| r.url.clone()).collect();
        if let Some((url, owner)) = self.store.find_remote_conflict(&mut *tx, name, &urls).await? {
            return Err(CatalogError::DuplicateRemoteUrl { url, name: owner });
        }

        let record = self.store.update(&mut *tx, name, version, server).await?;
        match new_status {
            Some(status) => self.store.set_status(&mut *tx, name, version, status).await,
            None => Ok(record),
        }
    }
}

async fn rollback_with_deadline(tx: Transaction<'static, Postgres>) {
    match tokio::time::timeout(ROLLBACK_TIMEOUT, tx.rollback()).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => warn!(error = %err, "Transaction rollback failed"),
        Err(_) => warn!("Transaction rollback timed out, connection will be recycled"),
    }
}
