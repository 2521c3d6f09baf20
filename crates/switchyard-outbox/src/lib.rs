//! The Effect Outbox (spec.md §4.D): a pool of workers delivering
//! [`switchyard_storage::outbox`] rows at least once through a
//! [`switchyard_core::PluginRegistry`], plus the sweep that reconciles
//! `unknown` rows once delivery is confirmed out-of-band.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod error;
mod outbox;
mod reconciler;
mod sender;
mod worker;

pub use config::{
    EffectOutboxConfig, DEFAULT_BATCH_SIZE, DEFAULT_IDLE_POLL_MS, DEFAULT_LEASE_MS,
    DEFAULT_MAX_ATTEMPTS, DEFAULT_RECONCILE_INTERVAL_SECS, DEFAULT_SEND_TIMEOUT_MS,
    DEFAULT_WORKER_COUNT,
};
pub use error::{EffectOutboxError, EffectOutboxResult};
pub use outbox::EffectOutbox;
pub use reconciler::{EffectReconciler, NoopReconciler};
