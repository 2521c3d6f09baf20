//! A real Postgres pool for integration-style tests.
//!
//! Storage is `sqlx`/Postgres throughout (no trait-abstracted in-memory
//! backend), so the idiomatic test fixture is a real test database rather
//! than a hand-rolled SQL fake — this mirrors `switchyard_storage::pool`'s
//! own `connect`/`connect_from_env` split.

use sqlx::PgPool;
use switchyard_storage::{StorageResult, migrate};

/// Env var naming the Postgres URL used by tests, kept distinct from
/// [`switchyard_storage::ENV_DATABASE_URL`] so a test run never points at a
/// production database by accident.
pub const ENV_TEST_DATABASE_URL: &str = "SWITCHYARD_TEST_DATABASE_URL";

/// Connect to the test database named by [`ENV_TEST_DATABASE_URL`] and run
/// migrations, leaving the caller with a ready-to-use pool.
///
/// # Errors
///
/// Returns a storage error if the env var is unset, the connection fails,
/// or migrations fail to apply.
///
/// # Panics
///
/// Panics if [`ENV_TEST_DATABASE_URL`] is unset — callers are expected to
/// gate tests that need a database behind this helper rather than silently
/// skip them.
pub async fn connect_test_pool() -> StorageResult<PgPool> {
    let url = std::env::var(ENV_TEST_DATABASE_URL).unwrap_or_else(|_| {
        panic!("{ENV_TEST_DATABASE_URL} must be set to run tests against a real database")
    });
    let pool = switchyard_storage::connect(&url).await?;
    migrate(&pool).await?;
    Ok(pool)
}
