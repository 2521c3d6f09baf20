//! Tunables for the worker pool (§4.C "Worker loop", "Backoff").

use switchyard_core::backoff::DEFAULT_MAX_ATTEMPTS;

/// Default lease duration held by a worker while a dispatch is `running`.
pub const DEFAULT_LEASE_MS: i64 = 30_000;
/// Default sleep when processing is disabled or nothing is claimable.
pub const DEFAULT_IDLE_POLL_MS: u64 = 500;
/// Default interval for the step-5 control-state/epoch check.
pub const DEFAULT_CONTROL_POLL_MS: u64 = 1_000;
/// Default worker pool size.
pub const DEFAULT_WORKER_COUNT: usize = 4;

/// Run Dispatcher worker pool configuration.
#[derive(Debug, Clone, Copy)]
pub struct RunDispatcherConfig {
    /// Number of concurrent claim loops to run.
    pub worker_count: usize,
    /// Lease duration per claim; the heartbeat task renews it at 1/3 of
    /// this interval.
    pub lease_ms: i64,
    /// Sleep between claim attempts when nothing was claimable.
    pub idle_poll_ms: u64,
    /// Interval between control-state/epoch checks while a run executes.
    pub control_poll_ms: u64,
    /// Attempts allowed before a dispatch is marked `failed` instead of
    /// requeued (§4.C "Backoff").
    pub max_attempts: u32,
}

impl Default for RunDispatcherConfig {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKER_COUNT,
            lease_ms: DEFAULT_LEASE_MS,
            idle_poll_ms: DEFAULT_IDLE_POLL_MS,
            control_poll_ms: DEFAULT_CONTROL_POLL_MS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl RunDispatcherConfig {
    /// Override the worker count (builder-style).
    #[must_use]
    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    /// Override the lease duration (builder-style).
    #[must_use]
    pub fn with_lease_ms(mut self, lease_ms: i64) -> Self {
        self.lease_ms = lease_ms;
        self
    }

    /// Override the max attempts before a dispatch is marked `failed`
    /// (builder-style).
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}
