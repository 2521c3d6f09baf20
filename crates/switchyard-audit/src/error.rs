use thiserror::Error;

/// Errors an [`crate::AuditSink`] implementation can return.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The backing store rejected the write or read.
    #[error("audit store error: {0}")]
    Store(String),
}

/// Convenience alias for audit sink operations.
pub type AuditResult<T> = Result<T, AuditError>;
