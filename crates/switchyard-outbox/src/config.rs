//! Tunables for the outbox worker pool (§4.D "Worker loop").

/// Default number of concurrent claim loops.
pub const DEFAULT_WORKER_COUNT: usize = 4;
/// Default claim batch size per loop iteration.
pub const DEFAULT_BATCH_SIZE: i64 = 20;
/// Default lease duration held while a row is `sending`.
pub const DEFAULT_LEASE_MS: i64 = 15_000;
/// Default sleep when a claim attempt returns nothing.
pub const DEFAULT_IDLE_POLL_MS: u64 = 500;
/// Default per-send timeout before a row is marked `unknown` instead of
/// `failed` (§4.D step 3: "the transport promises delivery but
/// acknowledgment is lost").
pub const DEFAULT_SEND_TIMEOUT_MS: u64 = 10_000;
/// Default interval between reconciliation sweeps over `unknown` rows.
pub const DEFAULT_RECONCILE_INTERVAL_SECS: u64 = 60;
/// Default maximum delivery attempts before a row is marked `failed`.
pub const DEFAULT_MAX_ATTEMPTS: i32 = 5;

/// Effect Outbox worker pool configuration.
#[derive(Debug, Clone, Copy)]
pub struct EffectOutboxConfig {
    /// Number of concurrent claim loops to run.
    pub worker_count: usize,
    /// Rows claimed per loop iteration.
    pub batch_size: i64,
    /// Lease duration per claim.
    pub lease_ms: i64,
    /// Sleep between claim attempts when nothing was claimable.
    pub idle_poll_ms: u64,
    /// How long to wait for `post_response` before treating the send as
    /// ambiguous.
    pub send_timeout_ms: u64,
    /// Interval between `unknown`-row reconciliation sweeps.
    pub reconcile_interval_secs: u64,
    /// Attempts allowed before a row is marked `failed`.
    pub max_attempts: i32,
}

impl Default for EffectOutboxConfig {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKER_COUNT,
            batch_size: DEFAULT_BATCH_SIZE,
            lease_ms: DEFAULT_LEASE_MS,
            idle_poll_ms: DEFAULT_IDLE_POLL_MS,
            send_timeout_ms: DEFAULT_SEND_TIMEOUT_MS,
            reconcile_interval_secs: DEFAULT_RECONCILE_INTERVAL_SECS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}
