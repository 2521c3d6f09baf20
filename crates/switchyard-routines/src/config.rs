//! Tunables for the routine evaluator's tick and event-drain loops.

/// Default number of cron/condition/oneshot routines or queued events
/// considered per poll.
pub const DEFAULT_BATCH_SIZE: i64 = 50;

/// Default delay between idle polls when a tick finds no due work.
pub const DEFAULT_IDLE_POLL_MS: u64 = 1_000;

/// Default delay between cron/condition/oneshot ticks.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 5_000;

/// Default lease held on claimed routine events while they're matched
/// against enabled `Event` routines.
pub const DEFAULT_EVENT_LEASE_MS: i64 = 30_000;

/// Default minimum spacing between two enqueued fires of the same
/// routine (§4.E "Throttling"), applied when a routine doesn't override
/// it via its own config.
pub const DEFAULT_THROTTLE_MS: i64 = 60_000;

/// Tunables for [`crate::evaluator::RoutineEvaluator`].
#[derive(Debug, Clone, Copy)]
pub struct RoutineEvaluatorConfig {
    /// Routines or events considered per poll.
    pub batch_size: i64,
    /// Delay between idle polls.
    pub idle_poll_ms: u64,
    /// Delay between cron/condition/oneshot ticks.
    pub tick_interval_ms: u64,
    /// Lease held on claimed routine events.
    pub event_lease_ms: i64,
    /// Minimum spacing between two enqueued fires of the same routine,
    /// applied when not overridden per-routine.
    pub default_throttle_ms: i64,
}

impl Default for RoutineEvaluatorConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            idle_poll_ms: DEFAULT_IDLE_POLL_MS,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            event_lease_ms: DEFAULT_EVENT_LEASE_MS,
            default_throttle_ms: DEFAULT_THROTTLE_MS,
        }
    }
}
