//! Crate error type.

use thiserror::Error;

/// Errors surfaced by Crash Guard's storage/audit side effects.
#[derive(Debug, Error)]
pub enum CrashGuardError {
    /// The underlying plugin-instance store rejected a read or write.
    #[error("crash guard storage error: {0}")]
    Storage(#[from] switchyard_storage::StorageError),
    /// The audit sink rejected a write.
    #[error("crash guard audit error: {0}")]
    Audit(#[from] switchyard_audit::AuditError),
}

/// Convenience alias.
pub type CrashGuardResult<T> = Result<T, CrashGuardError>;
