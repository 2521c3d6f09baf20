//! Crate error type.

use thiserror::Error;

/// Errors surfaced by the outbox worker loop's storage side effects.
#[derive(Debug, Error)]
pub enum EffectOutboxError {
    /// The underlying store rejected a read or write.
    #[error("effect outbox storage error: {0}")]
    Storage(#[from] switchyard_storage::StorageError),
}

/// Convenience alias.
pub type EffectOutboxResult<T> = Result<T, EffectOutboxError>;
