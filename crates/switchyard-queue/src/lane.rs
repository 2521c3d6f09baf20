//! One lane's in-memory state (§4.B states: `idle → debouncing → running →
//! (pending?) → running | idle`).
//!
//! Buffered message text itself lives only in the durable `queue_messages`
//! mirror (status `pending`); a lane here tracks just enough to drive the
//! state machine and debounce timer without re-querying storage on every
//! transition.

use switchyard_core::{DispatchId, SessionKey};
use switchyard_storage::LaneMode;

/// The in-memory sub-state of a lane. `queue_lanes.state` only distinguishes
/// `idle`/`queued`/`running`; `Debouncing` and `Running` both mirror as
/// `queued`/`running` respectively, per the storage model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubState {
    /// No buffered work.
    Idle,
    /// A debounce timer is armed.
    Debouncing,
    /// A dispatch is active for this lane.
    Running,
}

/// One lane's full in-memory state, held behind a per-lane mutex.
#[derive(Debug)]
pub struct LaneInner {
    /// Current sub-state.
    pub sub_state: SubState,
    /// Coalescing mode.
    pub mode: LaneMode,
    /// Whether this lane is administratively paused (drops all input).
    pub is_paused: bool,
    /// The dispatch currently running for this lane, if any.
    pub active_dispatch_id: Option<DispatchId>,
    /// Bumped every time the debounce timer is (re)armed, so a stale timer
    /// firing after a reset can recognize it's obsolete.
    pub generation: u64,
    /// Debounce window in effect for this lane.
    pub debounce_ms: i64,
    /// Pending-queue cap in effect for this lane.
    pub max_queued: i32,
    /// Agent this lane dispatches to, learned from the first enqueue.
    pub agent_id: Option<String>,
    /// Session shard key, learned from the first enqueue.
    pub session_key: Option<SessionKey>,
}

impl LaneInner {
    /// Build a fresh lane from a durable mirror row's current settings.
    #[must_use]
    pub fn new(
        sub_state: SubState,
        mode: LaneMode,
        is_paused: bool,
        active_dispatch_id: Option<DispatchId>,
        debounce_ms: i64,
        max_queued: i32,
    ) -> Self {
        Self {
            sub_state,
            mode,
            is_paused,
            active_dispatch_id,
            generation: 0,
            debounce_ms,
            max_queued,
            agent_id: None,
            session_key: None,
        }
    }
}
