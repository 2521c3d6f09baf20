//! Configurable `tracing-subscriber` setup.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

use crate::error::{TelemetryError, TelemetryResult};

/// Output shape for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, multi-line, for local development.
    Pretty,
    /// Single-line human-readable, for terminals with scrollback limits.
    Compact,
    /// Newline-delimited JSON, for log aggregation.
    Json,
}

impl Default for LogFormat {
    fn default() -> Self {
        Self::Compact
    }
}

/// Logging configuration: base level plus per-target directive overrides
/// layered the way `RUST_LOG` itself layers them.
#[derive(Debug, Clone)]
pub struct LogConfig {
    level: String,
    format: LogFormat,
    directives: Vec<String>,
}

impl LogConfig {
    /// Start from a base level (`"trace"`, `"debug"`, `"info"`, ...).
    #[must_use]
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            format: LogFormat::default(),
            directives: Vec::new(),
        }
    }

    /// Override the output format (builder-style).
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Append a per-target directive, e.g. `"switchyard_dispatcher=trace"`
    /// (builder-style).
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    fn filter(&self) -> TelemetryResult<EnvFilter> {
        let mut spec = self.level.clone();
        for directive in &self.directives {
            spec.push(',');
            spec.push_str(directive);
        }
        EnvFilter::try_new(spec).map_err(|e| TelemetryError::Init(e.to_string()))
    }
}

/// Install a global subscriber built from `config`.
///
/// # Errors
///
/// Returns [`TelemetryError::Init`] if a directive fails to parse or a
/// global subscriber is already installed.
pub fn setup_logging(config: &LogConfig) -> TelemetryResult<()> {
    let filter = config.filter()?;
    let registry = Registry::default().with(filter);

    let result = match config.format {
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
        LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json().flatten_event(true)).try_init(),
    };

    result.map_err(|e| TelemetryError::Init(e.to_string()))
}

/// Install a global subscriber from `RUST_LOG`, falling back to `"info"`
/// with [`LogFormat::Compact`] when unset.
///
/// # Errors
///
/// Returns [`TelemetryError::Init`] on the same conditions as
/// [`setup_logging`].
pub fn setup_default_logging() -> TelemetryResult<()> {
    let level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    setup_logging(&LogConfig::new(level))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_combines_level_and_directives() {
        let config = LogConfig::new("info").with_directive("switchyard_queue=debug");
        assert!(config.filter().is_ok());
    }

    #[test]
    fn rejects_malformed_directive() {
        let config = LogConfig::new("info").with_directive("not a directive!!");
        assert!(config.filter().is_err());
    }
}
