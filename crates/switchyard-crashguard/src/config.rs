//! Tunables for the sliding failure window (§4.G "Parameters").

use chrono::Duration;

/// Default window width: 5 minutes.
pub const DEFAULT_WINDOW_SECS: i64 = 5 * 60;
/// Default failure count that trips auto-disable.
pub const DEFAULT_THRESHOLD: usize = 5;

/// Sliding-window crash guard parameters.
#[derive(Debug, Clone, Copy)]
pub struct CrashGuardConfig {
    /// How far back failures are counted.
    pub window: Duration,
    /// Failures within `window` at or above this count trip auto-disable.
    pub threshold: usize,
}

impl Default for CrashGuardConfig {
    fn default() -> Self {
        Self {
            window: Duration::seconds(DEFAULT_WINDOW_SECS),
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl CrashGuardConfig {
    /// Override the window width (builder-style).
    #[must_use]
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Override the threshold (builder-style).
    #[must_use]
    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }
}
