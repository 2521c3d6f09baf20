//! Tunables for debounce/coalesce behavior (§4.B "Algorithm").

/// Default debounce window: 250 ms, within the spec's 100-500ms typical
/// range.
pub const DEFAULT_DEBOUNCE_MS: i64 = 250;
/// Default cap on the `running`-state pending queue.
pub const DEFAULT_MAX_QUEUED: i32 = 20;

/// Per-queue defaults for newly created lanes.
#[derive(Debug, Clone, Copy)]
pub struct SessionQueueConfig {
    /// Debounce window applied to newly created lanes.
    pub debounce_ms: i64,
    /// Pending-queue cap applied to newly created lanes.
    pub max_queued: i32,
}

impl Default for SessionQueueConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            max_queued: DEFAULT_MAX_QUEUED,
        }
    }
}

impl SessionQueueConfig {
    /// Override the debounce window (builder-style).
    #[must_use]
    pub fn with_debounce_ms(mut self, debounce_ms: i64) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }

    /// Override the pending-queue cap (builder-style).
    #[must_use]
    pub fn with_max_queued(mut self, max_queued: i32) -> Self {
        self.max_queued = max_queued;
        self
    }
}
