//! Read API: list, get-latest, versions, specific version.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use registry_catalog::{Cursor, ListFilter};
use registry_core::{ServerJson, ServerRecord};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::instrument;

/// Page-size bounds for the list endpoint.
const DEFAULT_LIST_LIMIT: i64 = 30;
const MAX_LIST_LIMIT: i64 = 100;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v0/servers", get(list_servers))
        .route("/v0/servers/{name}", get(get_server))
        .route("/v0/servers/{name}/versions", get(list_server_versions))
        .route("/v0/servers/{name}/versions/{version}", get(get_server_version))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    cursor: Option<String>,
    // Parsed by hand so out-of-range input gets a specific message instead
    // of a generic query rejection.
    limit: Option<String>,
    updated_since: Option<String>,
    search: Option<String>,
    version: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    next_cursor: Option<String>,
    count: usize,
}

#[derive(Serialize)]
struct ListResponse {
    servers: Vec<ServerJson>,
    metadata: ListMetadata,
}

#[derive(Serialize)]
struct VersionsResponse {
    servers: Vec<ServerJson>,
}

#[instrument(skip(state, query))]
async fn list_servers(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<ListResponse>> {
    let limit = match &query.limit {
        None => DEFAULT_LIST_LIMIT,
        Some(raw) => raw.parse::<i64>().map_err(|_| {
            ApiError::BadRequest("limit must be an integer between 1 and 100".to_string())
        })?,
    };
    if !(1..=MAX_LIST_LIMIT).contains(&limit) {
        return Err(ApiError::BadRequest(
            "limit must be between 1 and 100".to_string(),
        ));
    }

    let cursor = query
        .cursor
        .as_deref()
        .map(Cursor::from_str)
        .transpose()?;

    let updated_since = query
        .updated_since
        .as_deref()
        .map(|raw| {
            DateTime::parse_from_rfc3339(raw)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|_| {
                    ApiError::BadRequest(
                        "updated_since must be an RFC 3339 timestamp".to_string(),
                    )
                })
        })
        .transpose()?;

    let mut filter = ListFilter {
        updated_since,
        search: query.search.clone(),
        ..ListFilter::default()
    };
    match query.version.as_deref() {
        Some("latest") => filter.is_latest = Some(true),
        Some(version) => filter.version = Some(version.to_string()),
        None => {}
    }

    let (records, next_cursor) = state.store.list(&filter, cursor.as_ref(), limit).await?;
    let servers: Vec<ServerJson> = records.iter().map(ServerRecord::to_wire).collect();
    let count = servers.len();

    Ok(Json(ListResponse {
        servers,
        metadata: ListMetadata {
            next_cursor: next_cursor.map(|c| c.to_string()),
            count,
        },
    }))
}

#[instrument(skip(state))]
async fn get_server(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<ServerJson>> {
    let record = state.store.get_by_name(&name).await?;
    Ok(Json(record.to_wire()))
}

#[instrument(skip(state))]
async fn list_server_versions(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<VersionsResponse>> {
    let records = state.store.get_all_versions_by_name(&name).await?;
    if records.is_empty() {
        return Err(ApiError::NotFound(format!("server not found: {name}")));
    }
    Ok(Json(VersionsResponse {
        servers: records.iter().map(ServerRecord::to_wire).collect(),
    }))
}

#[instrument(skip(state))]
async fn get_server_version(
    State(state): State<AppState>,
    Path((name, version)): Path<(String, String)>,
) -> ApiResult<Json<ServerJson>> {
    let record = state.store.get_by_name_and_version(&name, &version).await?;
    Ok(Json(record.to_wire()))
}
