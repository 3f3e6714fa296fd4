//! Router-level tests that exercise validation, auth, and redirect behavior
//! without touching a database (the pool is lazy and never connects).

use axum::http::StatusCode;
use axum_test::TestServer;
use registry_api::{create_app, AppState, Config};
use registry_auth::{SignedToken, TokenSigner};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;

const SECRET_HEX_BYTE: &str = "ab";

fn test_config(anonymous: bool) -> Config {
    Config {
        bind_addr: "127.0.0.1:0".to_string(),
        database_url: "postgres://localhost/unused".to_string(),
        jwt_secret_hex: Some(SECRET_HEX_BYTE.repeat(32)),
        enable_anonymous_auth: anonymous,
        enable_registry_validation: false,
        github_client_id: None,
        oidc_issuer: None,
        oidc_client_id: None,
        oidc_extra_claims: Default::default(),
        oidc_publish_permissions: None,
        oidc_edit_permissions: None,
    }
}

fn test_server(anonymous: bool) -> TestServer {
    let pool = PgPoolOptions::new()
        .connect_lazy("postgres://localhost/unused")
        .expect("lazy pool");
    let state = AppState::new(pool, &test_config(anonymous)).expect("state");
    TestServer::new(create_app(state)).expect("test server")
}

#[tokio::test]
async fn health_and_ping_respond() {
    let server = test_server(false);

    let response = server.get("/v0/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");

    server.get("/v0/ping").await.assert_status_ok();
}

#[tokio::test]
async fn anonymous_exchange_is_gated_by_configuration() {
    let server = test_server(false);
    let response = server.post("/v0/auth/none").await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let server = test_server(true);
    let response = server.post("/v0/auth/none").await;
    response.assert_status_ok();

    let token: SignedToken = response.json();
    let signer = TokenSigner::from_hex(&SECRET_HEX_BYTE.repeat(32)).unwrap();
    let claims = signer.verify(&token.registry_token).unwrap();
    assert_eq!(claims.sub, "anonymous");
    assert_eq!(claims.permissions.len(), 2);
}

#[tokio::test]
async fn publish_requires_a_bearer_token() {
    let server = test_server(true);
    let payload = json!({
        "name": "io.example/server",
        "description": "d",
        "version": "1.0.0"
    });

    let response = server.post("/v0/publish").json(&payload).await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let response = server
        .post("/v0/publish")
        .authorization_bearer("not-a-token")
        .json(&payload)
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn anonymous_token_cannot_publish_outside_its_namespace() {
    let server = test_server(true);
    let token: SignedToken = server.post("/v0/auth/none").await.json();

    let response = server
        .post("/v0/publish")
        .authorization_bearer(&token.registry_token)
        .json(&json!({
            "name": "io.example/server",
            "description": "d",
            "version": "1.0.0"
        }))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
    let body: Value = response.json();
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("io.example/server"));
    assert!(message.contains("io.modelcontextprotocol.anonymous/*"));
}

#[tokio::test]
async fn trailing_slashes_redirect_to_canonical_paths() {
    let server = test_server(false);

    let response = server.get("/v0/servers/").await;
    response.assert_status(StatusCode::PERMANENT_REDIRECT);
    assert_eq!(
        response.headers().get("location").unwrap(),
        "/v0/servers"
    );

    let response = server.get("/v0/servers/?limit=5").await;
    response.assert_status(StatusCode::PERMANENT_REDIRECT);
    assert_eq!(
        response.headers().get("location").unwrap(),
        "/v0/servers?limit=5"
    );
}

#[tokio::test]
async fn list_rejects_malformed_query_parameters() {
    let server = test_server(false);

    let response = server.get("/v0/servers?limit=0").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "limit must be between 1 and 100");

    let response = server.get("/v0/servers?limit=101").await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = server.get("/v0/servers?limit=abc").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "limit must be an integer between 1 and 100");

    let response = server.get("/v0/servers?cursor=missing-separator").await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = server.get("/v0/servers?updated_since=yesterday").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "updated_since must be an RFC 3339 timestamp");
}

#[tokio::test]
async fn edit_rejects_path_body_mismatches_before_storage() {
    let server = test_server(true);
    let token: SignedToken = server.post("/v0/auth/none").await.json();

    // Body name differs from the path name: rejected as a rename attempt.
    let response = server
        .put("/v0/servers/io.modelcontextprotocol.anonymous%2Fserver/versions/1.0.0")
        .authorization_bearer(&token.registry_token)
        .json(&json!({
            "name": "io.modelcontextprotocol.anonymous/other",
            "description": "d",
            "version": "1.0.0"
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    // Body version differs from the path version: no version rewrite.
    let response = server
        .put("/v0/servers/io.modelcontextprotocol.anonymous%2Fserver/versions/1.0.0")
        .authorization_bearer(&token.registry_token)
        .json(&json!({
            "name": "io.modelcontextprotocol.anonymous/server",
            "description": "d",
            "version": "2.0.0"
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    // Unknown status enum value.
    let response = server
        .put("/v0/servers/io.modelcontextprotocol.anonymous%2Fserver/versions/1.0.0?status=archived")
        .authorization_bearer(&token.registry_token)
        .json(&json!({
            "name": "io.modelcontextprotocol.anonymous/server",
            "description": "d",
            "version": "1.0.0"
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn domain_proof_validation_fails_closed_without_network() {
    let server = test_server(false);

    // Malformed domain is rejected before any record fetch.
    let response = server
        .post("/v0/auth/dns")
        .json(&json!({
            "domain": "-bad-.example.com",
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "signed_timestamp": "00"
        }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    // Malformed timestamp is rejected before any record fetch.
    let response = server
        .post("/v0/auth/http")
        .json(&json!({
            "domain": "example.com",
            "timestamp": "not-a-timestamp",
            "signed_timestamp": "00"
        }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}
