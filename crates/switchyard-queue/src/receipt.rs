//! What `enqueue` hands back to a caller (§4.B "Contract": "never rejects;
//! over-limit messages are dropped with a receipt").

use switchyard_core::DispatchId;

/// Why a message was dropped instead of buffered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The lane's `running`-state pending queue was already at `max_queued`.
    QueueFull,
    /// The lane is administratively paused.
    LanePaused,
}

/// The outcome of one `enqueue` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Accepted into the debounce buffer; a timer is armed or was reset.
    Debouncing,
    /// The debounce timer fired as part of this call, and a new dispatch
    /// was written.
    Dispatched(DispatchId),
    /// Accepted into the `running`-state pending queue.
    Queued,
    /// Not accepted.
    Dropped(DropReason),
}
