//! Connection pooling and migration, grounded on the teacher's connect/
//! migrate split (one function each, no hidden side effects).

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::error::StorageResult;

/// Environment variable holding the Postgres connection string.
pub const ENV_DATABASE_URL: &str = "SWITCHYARD_DATABASE_URL";

/// Connect to Postgres using [`ENV_DATABASE_URL`].
///
/// # Errors
///
/// Returns [`crate::StorageError::Database`] if the env var is unset or the
/// connection attempt fails.
pub async fn connect_from_env() -> StorageResult<PgPool> {
    let url = std::env::var(ENV_DATABASE_URL)
        .map_err(|_| sqlx::Error::Configuration(format!("missing env var {ENV_DATABASE_URL}").into()))?;
    connect(&url).await
}

/// Connect to Postgres at the given URL with the pool sizing this pipeline
/// expects (many short-lived claim queries, a handful of long-held
/// connections for heartbeat tasks).
///
/// # Errors
///
/// Returns [`crate::StorageError::Database`] if the connection fails.
pub async fn connect(url: &str) -> StorageResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(url)
        .await?;
    Ok(pool)
}

/// Apply embedded migrations.
///
/// # Errors
///
/// Returns [`crate::StorageError::Migration`] if any migration fails to
/// apply.
pub async fn migrate(pool: &PgPool) -> StorageResult<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
