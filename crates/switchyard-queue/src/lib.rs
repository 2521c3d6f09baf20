//! Session Queue: a per-lane debounce/coalesce state machine that serializes
//! per-session work ahead of the Run Dispatcher (spec.md §4.B).

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod coalesce;
mod config;
mod error;
mod lane;
mod observer;
mod queue;
mod receipt;

pub use coalesce::{coalesce, Coalesced};
pub use config::{SessionQueueConfig, DEFAULT_DEBOUNCE_MS, DEFAULT_MAX_QUEUED};
pub use error::{SessionQueueError, SessionQueueResult};
pub use observer::{NoopQueueObserver, QueueObserver};
pub use queue::{EnqueueRequest, SessionQueue};
pub use receipt::{DropReason, EnqueueOutcome};
