//! The Routine Evaluator (spec.md §4.E): cron/condition/oneshot ticks
//! scanning `next_run_at`, and event-triggered rule matching draining
//! `routine_event_queue`. Matching routines enqueue a Scheduled Item
//! (time-based) or a Run Dispatch directly (event-based).

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod cron;
mod error;
mod evaluator;
mod event;
mod probe;
mod routine_evaluator;
mod rule;
mod scheduled_worker;

pub use config::{
    RoutineEvaluatorConfig, DEFAULT_BATCH_SIZE, DEFAULT_EVENT_LEASE_MS, DEFAULT_IDLE_POLL_MS,
    DEFAULT_THROTTLE_MS, DEFAULT_TICK_INTERVAL_MS,
};
pub use cron::CronSchedule;
pub use error::{RoutineError, RoutineResult};
pub use evaluator::NoopProbeRegistry;
pub use probe::{ConditionProbe, ConditionProbeRegistry};
pub use routine_evaluator::RoutineEvaluator;
pub use rule::{evaluate, Op, Rule};
