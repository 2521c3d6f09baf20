use thiserror::Error;

/// Errors surfaced by the storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The underlying Postgres driver returned an error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    /// Migration failed to apply.
    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    /// A row was expected but not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// A stored enum column held a value this binary doesn't recognize.
    #[error("unrecognized enum value {value:?} in column {column}")]
    UnrecognizedEnum {
        /// Column name.
        column: &'static str,
        /// The offending stored value.
        value: String,
    },
}

/// Convenience alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
