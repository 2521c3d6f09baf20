//! Crate error type.

use thiserror::Error;

/// Errors surfaced by the routine evaluator.
#[derive(Debug, Error)]
pub enum RoutineError {
    /// The underlying store rejected a read or write.
    #[error("routine storage error: {0}")]
    Storage(#[from] switchyard_storage::StorageError),
    /// A rule tree or cron expression was malformed.
    #[error("malformed rule: {0}")]
    MalformedRule(String),
}

/// Convenience alias.
pub type RoutineResult<T> = Result<T, RoutineError>;
