//! Crate error type.

use thiserror::Error;

/// Errors surfaced while parsing environment-variable configuration
/// (§7 "Input validation" — malformed config is surfaced synchronously).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A numeric env var held a value that didn't parse.
    #[error("invalid value for {var}: {value:?}")]
    InvalidNumber {
        /// The env var name.
        var: &'static str,
        /// The raw value that failed to parse.
        value: String,
    },
    /// `PLUGIN_TRUST_MODE` held a value outside its closed vocabulary.
    #[error(
        "invalid PLUGIN_TRUST_MODE {value:?}, expected self_host_open, self_host_guarded, or saas_locked"
    )]
    InvalidTrustMode {
        /// The raw value that failed to parse.
        value: String,
    },
}

/// Convenience alias.
pub type ConfigResult<T> = Result<T, ConfigError>;
