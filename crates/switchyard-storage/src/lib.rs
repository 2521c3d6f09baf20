//! Relational storage for the orchestration ledger (spec.md §3 "Data
//! Model"): work items, idempotency keys, session queue lanes, run
//! dispatches, the effect outbox, scheduled items, routines, and runtime
//! control, all backed by Postgres via `sqlx`.
//!
//! Claim queries use `FOR UPDATE SKIP LOCKED` plus epoch-fenced
//! compare-and-swap updates rather than advisory locks, so multiple
//! worker processes can share one pool safely. None of the query
//! functions here use `sqlx`'s compile-time-checked macros — rows are
//! mapped by hand with [`sqlx::Row::try_get`] — since this crate targets
//! environments where a live, migrated database isn't available at
//! build time.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod audit_sink;
pub mod control;
pub mod dispatch;
pub mod error;
pub mod outbox;
pub mod plugins;
pub mod pool;
pub mod queue;
pub mod routines;
pub mod scheduled;
pub mod work_items;

pub use audit_sink::PgAuditSink;
pub use control::{ControlRow, PauseMode};
pub use dispatch::{ControlState, DispatchRow, DispatchStatus};
pub use error::{StorageError, StorageResult};
pub use outbox::{EffectRow, EffectStatus};
pub use plugins::PluginInstanceRow;
pub use pool::{connect, connect_from_env, migrate, ENV_DATABASE_URL};
pub use queue::{LaneMode, LaneState, MessageStatus, QueueLaneRow, QueueMessageRow};
pub use routines::{Decision, RoutineRow, TriggerKind};
pub use scheduled::{ScheduledItemRow, ScheduledItemStatus, ScheduledItemType};
