use crate::error::Result;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use std::str::FromStr;
use std::time::Duration;
use tracing::instrument;

/// Pool sizing tuned for stability over burst throughput.
pub const MAX_CONNECTIONS: u32 = 30;
pub const MIN_CONNECTIONS: u32 = 5;
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);
pub const MAX_LIFETIME: Duration = Duration::from_secs(2 * 60 * 60);

/// Service-boundary deadline for any single database call.
pub const STATEMENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Initialize the database connection pool.
#[instrument(skip(database_url))]
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    let options = PgConnectOptions::from_str(database_url)?
        .options([("statement_timeout", &STATEMENT_TIMEOUT.as_millis().to_string())]);

    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .min_connections(MIN_CONNECTIONS)
        .idle_timeout(IDLE_TIMEOUT)
        .max_lifetime(MAX_LIFETIME)
        .acquire_timeout(STATEMENT_TIMEOUT)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Run database migrations.
#[instrument(skip(pool))]
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;

    Ok(())
}
