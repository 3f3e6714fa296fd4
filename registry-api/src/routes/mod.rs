pub mod auth_exchange;
pub mod health;
pub mod publish;
pub mod servers;

use crate::state::AppState;
use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub fn create_app(state: AppState) -> Router {
    // Permissive CORS: the registry is a public read surface.
    let cors = CorsLayer::permissive();

    Router::new()
        .merge(health::routes())
        .merge(servers::routes())
        .merge(publish::routes())
        .merge(auth_exchange::routes())
        .layer(middleware::from_fn(redirect_trailing_slash))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Non-root paths with a trailing slash 308-redirect to the canonical form,
/// preserving the query string.
async fn redirect_trailing_slash(request: Request, next: Next) -> Response {
    let path = request.uri().path();
    if path.len() > 1 && path.ends_with('/') {
        let stripped = path.trim_end_matches('/');
        let canonical = if stripped.is_empty() { "/" } else { stripped };
        let target = match request.uri().query() {
            Some(query) => format!("{canonical}?{query}"),
            None => canonical.to_string(),
        };
        return Redirect::permanent(&target).into_response();
    }
    next.run(request).await
}
