//! The Run Dispatcher (spec.md §4.C): a pool of workers that claim queued
//! [`switchyard_storage::dispatch`] rows, invoke an [`AgentRunner`] under a
//! renewed lease, and resolve each run to `completed`, a backed-off
//! requeue, or a terminal `failed`/`cancelled`/`paused` state.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod dispatcher;
mod error;
mod runner;
mod worker;

pub use config::{
    RunDispatcherConfig, DEFAULT_CONTROL_POLL_MS, DEFAULT_IDLE_POLL_MS, DEFAULT_LEASE_MS,
    DEFAULT_WORKER_COUNT,
};
pub use dispatcher::RunDispatcher;
pub use error::{DispatcherError, DispatcherResult};
pub use runner::{AgentRunner, EffectRequest, RunError, RunOutcome, RunRequest};
