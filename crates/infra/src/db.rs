//! Connection pool wiring.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("failed to connect to Postgres: {0}")]
    Connect(#[source] sqlx::Error),
}

/// Open a pool against `database_url`.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, DbError> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .map_err(DbError::Connect)?;

    info!(max_connections, "postgres pool ready");
    Ok(pool)
}
