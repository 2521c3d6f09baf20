//! Telemetry error types.

use thiserror::Error;

/// Errors that can occur while setting up telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The global subscriber was already installed (e.g. by a test
    /// harness) or the filter directive failed to parse.
    #[error("telemetry initialization error: {0}")]
    Init(String),
    /// Writing to a log file target failed.
    #[error("telemetry IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
