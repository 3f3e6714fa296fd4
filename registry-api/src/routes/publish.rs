//! Write API: publish and edit.

use crate::auth::{require_permission, Publisher};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::{post, put},
    Json, Router,
};
use registry_core::{Action, ServerJson, ServerStatus};
use serde::Deserialize;
use tracing::instrument;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v0/publish", post(publish_server))
        .route("/v0/servers/{name}/versions/{version}", put(edit_server))
}

#[instrument(skip(state, publisher, server), fields(subject = %publisher.0.sub, name = %server.name, version = %server.version))]
async fn publish_server(
    State(state): State<AppState>,
    publisher: Publisher,
    Json(server): Json<ServerJson>,
) -> ApiResult<Json<ServerJson>> {
    require_permission(&publisher.0, Action::Publish, &server.name)?;

    let record = state.service.publish(server).await?;
    Ok(Json(record.to_wire()))
}

#[derive(Debug, Deserialize)]
struct EditQuery {
    status: Option<String>,
}

#[instrument(skip(state, publisher, server), fields(subject = %publisher.0.sub, name = %name, version = %version))]
async fn edit_server(
    State(state): State<AppState>,
    publisher: Publisher,
    Path((name, version)): Path<(String, String)>,
    Query(query): Query<EditQuery>,
    Json(server): Json<ServerJson>,
) -> ApiResult<Json<ServerJson>> {
    require_permission(&publisher.0, Action::Edit, &name)?;

    let status = query
        .status
        .as_deref()
        .map(|raw| {
            raw.parse::<ServerStatus>().map_err(|_| {
                ApiError::BadRequest(format!(
                    "invalid status {raw}; expected active, deprecated, or deleted"
                ))
            })
        })
        .transpose()?;

    let record = state.service.edit(&name, &version, server, status).await?;
    Ok(Json(record.to_wire()))
}
