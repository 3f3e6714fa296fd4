use anyhow::Result;
use registry_api::{create_app, AppState, Config};
use registry_catalog::{create_pool, run_migrations};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "registry_api=debug,registry_catalog=debug,registry_auth=debug,tower_http=debug".into()
        }))
        .init();

    info!("Starting MCP registry service...");

    let config = Config::from_env();

    let pool = create_pool(&config.database_url).await?;
    info!("Running database migrations...");
    run_migrations(&pool).await?;
    info!("Migrations complete");

    let state = AppState::new(pool, &config)?;
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Listening on http://{}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
