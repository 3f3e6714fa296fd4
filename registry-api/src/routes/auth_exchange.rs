//! Token exchange endpoints, one per auth method.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::{extract::State, routing::post, Json, Router};
use chrono::Utc;
use registry_auth::{anonymous_grants, AuthMethod, DomainProof, SignedToken, ANONYMOUS_SUBJECT};
use serde::Deserialize;
use tracing::instrument;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v0/auth/dns", post(exchange_dns))
        .route("/v0/auth/http", post(exchange_http))
        .route("/v0/auth/github", post(exchange_github_pat))
        .route("/v0/auth/github-oidc", post(exchange_github_oidc))
        .route("/v0/auth/oidc", post(exchange_oidc))
        .route("/v0/auth/none", post(exchange_anonymous))
}

#[instrument(skip(state, proof), fields(domain = %proof.domain))]
async fn exchange_dns(
    State(state): State<AppState>,
    Json(proof): Json<DomainProof>,
) -> ApiResult<Json<SignedToken>> {
    let (subject, permissions) = state.auth.dns.authenticate(&proof, Utc::now()).await?;
    Ok(Json(state.signer.issue(AuthMethod::Dns, subject, permissions)?))
}

#[instrument(skip(state, proof), fields(domain = %proof.domain))]
async fn exchange_http(
    State(state): State<AppState>,
    Json(proof): Json<DomainProof>,
) -> ApiResult<Json<SignedToken>> {
    let (subject, permissions) = state.auth.http.authenticate(&proof, Utc::now()).await?;
    Ok(Json(state.signer.issue(AuthMethod::Http, subject, permissions)?))
}

#[derive(Deserialize)]
struct GithubTokenRequest {
    github_token: String,
}

#[instrument(skip_all)]
async fn exchange_github_pat(
    State(state): State<AppState>,
    Json(request): Json<GithubTokenRequest>,
) -> ApiResult<Json<SignedToken>> {
    let (subject, permissions) = state.auth.github.exchange_pat(&request.github_token).await?;
    Ok(Json(
        state
            .signer
            .issue(AuthMethod::GithubPat, subject, permissions)?,
    ))
}

#[derive(Deserialize)]
struct OidcTokenRequest {
    oidc_token: String,
}

#[instrument(skip_all)]
async fn exchange_github_oidc(
    State(state): State<AppState>,
    Json(request): Json<OidcTokenRequest>,
) -> ApiResult<Json<SignedToken>> {
    let (subject, permissions) = state.auth.github.exchange_oidc(&request.oidc_token).await?;
    Ok(Json(
        state
            .signer
            .issue(AuthMethod::GithubOidc, subject, permissions)?,
    ))
}

#[instrument(skip_all)]
async fn exchange_oidc(
    State(state): State<AppState>,
    Json(request): Json<OidcTokenRequest>,
) -> ApiResult<Json<SignedToken>> {
    let oidc = state
        .auth
        .oidc
        .as_ref()
        .ok_or_else(|| ApiError::Unauthorized("auth method not enabled".to_string()))?;

    let (subject, permissions) = oidc.exchange(&request.oidc_token).await?;
    Ok(Json(state.signer.issue(AuthMethod::Oidc, subject, permissions)?))
}

#[instrument(skip_all)]
async fn exchange_anonymous(State(state): State<AppState>) -> ApiResult<Json<SignedToken>> {
    if !state.auth.anonymous_enabled {
        return Err(ApiError::Unauthorized(
            "anonymous authentication is disabled".to_string(),
        ));
    }

    Ok(Json(state.signer.issue(
        AuthMethod::Anonymous,
        ANONYMOUS_SUBJECT,
        anonymous_grants(),
    )?))
}
