//! Crate error type.

use thiserror::Error;

/// Errors surfaced by the ingress router's storage and decoding side
/// effects. Plugin-level failures (`parse_error`, `plugin_type_mismatch`,
/// `unknown_plugin_type`) are not represented here — the router always
/// turns those into a `webhook_ingress` event plus an ordinary HTTP status,
/// never a `Result::Err` (§4.A "Failure semantics").
#[derive(Debug, Error)]
pub enum IngressError {
    /// The underlying store rejected a read or write.
    #[error("ingress storage error: {0}")]
    Storage(#[from] switchyard_storage::StorageError),
    /// The Session Queue rejected an admission attempt.
    #[error("session queue error: {0}")]
    Queue(#[from] switchyard_queue::SessionQueueError),
}

/// Convenience alias.
pub type IngressResult<T> = Result<T, IngressError>;
