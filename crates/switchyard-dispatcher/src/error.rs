//! Crate error type.

use thiserror::Error;

/// Errors surfaced by the worker loop's storage side effects.
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// The underlying store rejected a read or write.
    #[error("dispatcher storage error: {0}")]
    Storage(#[from] switchyard_storage::StorageError),
    /// The Session Queue's `onRunComplete` callback failed.
    #[error("session queue error: {0}")]
    Queue(#[from] switchyard_queue::SessionQueueError),
}

/// Convenience alias.
pub type DispatcherResult<T> = Result<T, DispatcherError>;
