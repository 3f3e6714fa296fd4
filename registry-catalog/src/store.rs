//! Catalog store: persistence for versioned server records.
//!
//! Write-path methods take `&mut PgConnection` so they compose under a
//! caller-owned transaction; read-path methods run directly on the pool.

use crate::error::{CatalogError, Result};
use chrono::{DateTime, Utc};
use registry_core::{RegistryMeta, ServerJson, ServerRecord, ServerStatus};
use sqlx::postgres::Postgres;
use sqlx::{PgConnection, PgPool, Transaction};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Default page size when the caller passes a non-positive limit.
pub const DEFAULT_LIST_LIMIT: i64 = 10;

const SERVER_COLUMNS: &str =
    "server_id, name, version, status, published_at, updated_at, is_latest, server_json";

/// Filter fields for [`CatalogStore::list`]. Unset fields do not constrain.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    /// Exact server name.
    pub name: Option<String>,
    /// Any version referencing this remote URL.
    pub remote_url: Option<String>,
    /// Rows updated strictly after this instant.
    pub updated_since: Option<DateTime<Utc>>,
    /// Case-insensitive substring of the name.
    pub search: Option<String>,
    /// Exact version string.
    pub version: Option<String>,
    /// Latest-flag filter.
    pub is_latest: Option<bool>,
}

/// Opaque list cursor, literal `<name>:<version>`.
///
/// Names cannot contain `:`, so splitting at the first separator is
/// unambiguous even for exotic version strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    pub name: String,
    pub version: String,
}

impl FromStr for Cursor {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once(':') {
            Some((name, version)) if !name.is_empty() && !version.is_empty() => Ok(Cursor {
                name: name.to_string(),
                version: version.to_string(),
            }),
            _ => Err(CatalogError::InvalidCursor(s.to_string())),
        }
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.version)
    }
}

#[derive(Clone)]
pub struct CatalogStore {
    pool: PgPool,
}

impl CatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the database pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Begin a transaction. Dropped transactions roll back.
    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>> {
        Ok(self.pool.begin().await?)
    }

    /// Acquire the transaction-scoped exclusive publish lock for `name`.
    ///
    /// The lock serializes publishes per name across all processes sharing
    /// the database and releases automatically on commit or rollback.
    pub async fn acquire_publish_lock(&self, conn: &mut PgConnection, name: &str) -> Result<()> {
        let key = publish_lock_key(name);
        debug!(name = %name, key = key, "Acquiring publish advisory lock");
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(key)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// Insert a new server version with its registry metadata.
    ///
    /// When `meta.is_latest` is set, the caller must have unmarked the
    /// previous latest row first; the partial unique index rejects two
    /// concurrent latest rows outright.
    pub async fn create(
        &self,
        conn: &mut PgConnection,
        server: &ServerJson,
        meta: &RegistryMeta,
    ) -> Result<ServerRecord> {
        if server.name.is_empty() {
            return Err(CatalogError::InvalidInput("server name is required".to_string()));
        }
        if server.version.is_empty() {
            return Err(CatalogError::InvalidInput("server version is required".to_string()));
        }

        let server_json = serde_json::to_value(server)?;
        let sql = format!(
            "INSERT INTO servers ({SERVER_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {SERVER_COLUMNS}"
        );

        let row = sqlx::query_as::<_, ServerRow>(&sql)
            .bind(meta.server_id)
            .bind(&server.name)
            .bind(&server.version)
            .bind(meta.status.as_str())
            .bind(meta.published_at)
            .bind(meta.updated_at)
            .bind(meta.is_latest)
            .bind(&server_json)
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| map_insert_error(e, &server.name, &server.version))?;

        row.try_into()
    }

    /// Replace the content fields of an existing version and bump
    /// `updated_at`. Status, publish time, latest flag, and server ID are
    /// untouched.
    pub async fn update(
        &self,
        conn: &mut PgConnection,
        name: &str,
        version: &str,
        server: &ServerJson,
    ) -> Result<ServerRecord> {
        let server_json = serde_json::to_value(server)?;
        let sql = format!(
            "UPDATE servers SET server_json = $1, updated_at = $2
             WHERE name = $3 AND version = $4
             RETURNING {SERVER_COLUMNS}"
        );

        let row = sqlx::query_as::<_, ServerRow>(&sql)
            .bind(&server_json)
            .bind(Utc::now())
            .bind(name)
            .bind(version)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("{name}@{version}")))?;

        row.try_into()
    }

    /// Transition a version's status. `deleted` is terminal.
    pub async fn set_status(
        &self,
        conn: &mut PgConnection,
        name: &str,
        version: &str,
        status: ServerStatus,
    ) -> Result<ServerRecord> {
        let current: Option<String> =
            sqlx::query_scalar("SELECT status FROM servers WHERE name = $1 AND version = $2 FOR UPDATE")
                .bind(name)
                .bind(version)
                .fetch_optional(&mut *conn)
                .await?;

        let current = current.ok_or_else(|| CatalogError::NotFound(format!("{name}@{version}")))?;
        if current == ServerStatus::Deleted.as_str() && status != ServerStatus::Deleted {
            return Err(CatalogError::DeletedIsTerminal);
        }

        let sql = format!(
            "UPDATE servers SET status = $1, updated_at = $2
             WHERE name = $3 AND version = $4
             RETURNING {SERVER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ServerRow>(&sql)
            .bind(status.as_str())
            .bind(Utc::now())
            .bind(name)
            .bind(version)
            .fetch_one(&mut *conn)
            .await?;

        row.try_into()
    }

    /// Clear the latest flag on the current latest row for `name`, if any.
    pub async fn unmark_as_latest(&self, conn: &mut PgConnection, name: &str) -> Result<()> {
        sqlx::query("UPDATE servers SET is_latest = false WHERE name = $1 AND is_latest")
            .bind(name)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// Fetch one version inside a transaction.
    pub async fn get(
        &self,
        conn: &mut PgConnection,
        name: &str,
        version: &str,
    ) -> Result<ServerRecord> {
        let sql = format!("SELECT {SERVER_COLUMNS} FROM servers WHERE name = $1 AND version = $2");
        let row = sqlx::query_as::<_, ServerRow>(&sql)
            .bind(name)
            .bind(version)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("{name}@{version}")))?;
        row.try_into()
    }

    /// All versions of `name`, newest publish first, inside a transaction.
    pub async fn all_versions(
        &self,
        conn: &mut PgConnection,
        name: &str,
    ) -> Result<Vec<ServerRecord>> {
        let sql = format!(
            "SELECT {SERVER_COLUMNS} FROM servers WHERE name = $1 ORDER BY published_at DESC"
        );
        let rows = sqlx::query_as::<_, ServerRow>(&sql)
            .bind(name)
            .fetch_all(&mut *conn)
            .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    pub async fn count_versions(&self, conn: &mut PgConnection, name: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT count(*) FROM servers WHERE name = $1")
            .bind(name)
            .fetch_one(&mut *conn)
            .await?;
        Ok(count)
    }

    pub async fn check_version_exists(
        &self,
        conn: &mut PgConnection,
        name: &str,
        version: &str,
    ) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM servers WHERE name = $1 AND version = $2)",
        )
        .bind(name)
        .bind(version)
        .fetch_one(&mut *conn)
        .await?;
        Ok(exists)
    }

    /// Returns `(url, owner)` for the first submitted remote URL already
    /// referenced by a different server name.
    pub async fn find_remote_conflict(
        &self,
        conn: &mut PgConnection,
        name: &str,
        urls: &[String],
    ) -> Result<Option<(String, String)>> {
        for url in urls {
            let owner: Option<String> = sqlx::query_scalar(
                "SELECT name FROM servers
                 WHERE name <> $1
                   AND server_json -> 'remotes' @> jsonb_build_array(jsonb_build_object('url', $2::text))
                 LIMIT 1",
            )
            .bind(name)
            .bind(url)
            .fetch_optional(&mut *conn)
            .await?;

            if let Some(owner) = owner {
                return Ok(Some((url.clone(), owner)));
            }
        }
        Ok(None)
    }

    /// Latest version of `name`.
    pub async fn get_by_name(&self, name: &str) -> Result<ServerRecord> {
        let sql = format!("SELECT {SERVER_COLUMNS} FROM servers WHERE name = $1 AND is_latest");
        let row = sqlx::query_as::<_, ServerRow>(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| CatalogError::NotFound(name.to_string()))?;
        row.try_into()
    }

    pub async fn get_by_name_and_version(&self, name: &str, version: &str) -> Result<ServerRecord> {
        let mut conn = self.pool.acquire().await?;
        self.get(&mut conn, name, version).await
    }

    /// All versions of `name`, newest publish first.
    pub async fn get_all_versions_by_name(&self, name: &str) -> Result<Vec<ServerRecord>> {
        let mut conn = self.pool.acquire().await?;
        self.all_versions(&mut conn, name).await
    }

    /// Cursor-paginated listing ordered by `(name asc, version asc)`.
    ///
    /// A `nextCursor` is emitted only when exactly `limit` rows came back;
    /// the next page is strictly greater under the compound order.
    pub async fn list(
        &self,
        filter: &ListFilter,
        cursor: Option<&Cursor>,
        limit: i64,
    ) -> Result<(Vec<ServerRecord>, Option<Cursor>)> {
        let limit = if limit <= 0 { DEFAULT_LIST_LIMIT } else { limit };

        let mut sql = format!("SELECT {SERVER_COLUMNS} FROM servers WHERE 1=1");
        let mut n = 0usize;
        let mut next = |sql: &mut String, clause: &str| {
            n += 1;
            sql.push_str(&clause.replace("$?", &format!("${n}")));
            n
        };

        if filter.name.is_some() {
            next(&mut sql, " AND name = $?");
        }
        if filter.remote_url.is_some() {
            next(
                &mut sql,
                " AND server_json -> 'remotes' @> jsonb_build_array(jsonb_build_object('url', $?::text))",
            );
        }
        if filter.updated_since.is_some() {
            next(&mut sql, " AND updated_at > $?");
        }
        if filter.search.is_some() {
            next(&mut sql, " AND name ILIKE $?");
        }
        if filter.version.is_some() {
            next(&mut sql, " AND version = $?");
        }
        if filter.is_latest.is_some() {
            next(&mut sql, " AND is_latest = $?");
        }
        if cursor.is_some() {
            let a = next(&mut sql, "");
            let b = next(&mut sql, "");
            sql.push_str(&format!(" AND (name, version) > (${a}, ${b})"));
        }
        let l = next(&mut sql, "");
        sql.push_str(&format!(" ORDER BY name ASC, version ASC LIMIT ${l}"));

        let mut query = sqlx::query_as::<_, ServerRow>(&sql);
        if let Some(name) = &filter.name {
            query = query.bind(name);
        }
        if let Some(url) = &filter.remote_url {
            query = query.bind(url);
        }
        if let Some(since) = &filter.updated_since {
            query = query.bind(since);
        }
        if let Some(search) = &filter.search {
            query = query.bind(format!("%{}%", escape_like(search)));
        }
        if let Some(version) = &filter.version {
            query = query.bind(version);
        }
        if let Some(is_latest) = filter.is_latest {
            query = query.bind(is_latest);
        }
        if let Some(cursor) = cursor {
            query = query.bind(&cursor.name).bind(&cursor.version);
        }
        query = query.bind(limit);

        let rows = query.fetch_all(&self.pool).await?;

        let next_cursor = if rows.len() as i64 == limit {
            rows.last().map(|r| Cursor {
                name: r.name.clone(),
                version: r.version.clone(),
            })
        } else {
            None
        };

        let records = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<_>>>()?;

        Ok((records, next_cursor))
    }
}

/// Advisory lock ID for a server name: FNV-1a-64 masked to 63 bits, because
/// the lock primitive takes a signed 64-bit integer.
pub fn publish_lock_key(name: &str) -> i64 {
    (fnv1a_64(name.as_bytes()) & 0x7FFF_FFFF_FFFF_FFFF) as i64
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET_BASIS, |hash, b| (hash ^ u64::from(*b)).wrapping_mul(PRIME))
}

/// Escape `%`, `_`, and `\` for use inside an ILIKE pattern.
fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

fn map_insert_error(e: sqlx::Error, name: &str, version: &str) -> CatalogError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return match db.constraint() {
                Some("servers_pkey") => CatalogError::DuplicateVersion {
                    name: name.to_string(),
                    version: version.to_string(),
                },
                _ => CatalogError::InvalidInput(db.message().to_string()),
            };
        }
        if db.is_check_violation() {
            return CatalogError::InvalidInput(db.message().to_string());
        }
    }
    CatalogError::Database(e)
}

// Internal row type for sqlx
#[derive(sqlx::FromRow)]
struct ServerRow {
    server_id: uuid::Uuid,
    name: String,
    version: String,
    status: String,
    published_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    is_latest: bool,
    server_json: serde_json::Value,
}

impl TryFrom<ServerRow> for ServerRecord {
    type Error = CatalogError;

    fn try_from(row: ServerRow) -> Result<Self> {
        let status = row
            .status
            .parse::<ServerStatus>()
            .map_err(CatalogError::InvalidInput)?;
        let server: ServerJson = serde_json::from_value(row.server_json)?;

        Ok(ServerRecord {
            server,
            meta: RegistryMeta {
                server_id: row.server_id,
                status,
                published_at: row.published_at,
                updated_at: row.updated_at,
                is_latest: row.is_latest,
            },
        })
    }
}
