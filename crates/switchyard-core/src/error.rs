//! Error classification shared across the pipeline (§7 Error handling design).

use thiserror::Error;

/// Errors that can surface from core type construction and validation.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Input failed validation before it reached a worker loop.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A JSON payload did not match the expected shape.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

/// Convenience alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// The five error kinds from §7, used to decide retry vs. terminal failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed config, invalid rule JSON, bad host pattern — surfaced
    /// synchronously to the caller.
    InputValidation,
    /// DB contention, outbound HTTP 5xx/429, connection resets — retried
    /// with exponential backoff.
    TransientIo,
    /// 4xx (except 429) signaling malformed input — terminal.
    NonRetryableRemote,
    /// Hook timeout, hook exception, handler crash — recorded as a
    /// receipt and counted by Crash Guard.
    PluginDefect,
    /// Runtime control corruption, persistent schema mismatch — logged,
    /// workers pause.
    Fatal,
}
