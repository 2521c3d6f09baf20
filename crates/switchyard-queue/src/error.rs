//! Crate error type.

use thiserror::Error;

/// Errors surfaced while mutating a lane's durable mirror.
#[derive(Debug, Error)]
pub enum SessionQueueError {
    /// The underlying store rejected a read or write.
    #[error("session queue storage error: {0}")]
    Storage(#[from] switchyard_storage::StorageError),
}

/// Convenience alias.
pub type SessionQueueResult<T> = Result<T, SessionQueueError>;
