//! Crate error type.

use thiserror::Error;

/// Errors surfaced by the runtime control surface.
#[derive(Debug, Error)]
pub enum ControlError {
    /// The underlying store rejected a read or write.
    #[error("runtime control storage error: {0}")]
    Storage(#[from] switchyard_storage::StorageError),
    /// `set_max_concurrent` was called with a value outside `1..=100`.
    #[error("max_concurrent {0} is outside the allowed range 1..=100")]
    InvalidConcurrency(i32),
}

/// Convenience alias.
pub type ControlResult<T> = Result<T, ControlError>;
