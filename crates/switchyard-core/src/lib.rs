//! Switchyard Core - Foundation types and traits for the event -> run ->
//! effect orchestration pipeline.
//!
//! This crate provides:
//! - Opaque ID newtypes shared across every other crate
//! - The closed status/state vocabularies from the data model
//! - The envelope used by the routine predicate engine
//! - The plugin handler interface (ingress parsing, config validation,
//!   response delivery, optional hooks)
//! - Backoff math shared by the Run Dispatcher and Effect Outbox
//! - Error classification (retryable vs. terminal)

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backoff;
pub mod envelope;
pub mod error;
pub mod ids;
pub mod plugin;
pub mod prelude;
pub mod work_item;

pub use backoff::{backoff_delay, is_retryable};
pub use envelope::Envelope;
pub use error::{CoreError, CoreResult};
pub use ids::{
    DispatchId, EffectId, IdempotencyKey, PluginInstanceId, QueueKey, RoutineId, RoutineRunId,
    ScheduledItemId, SessionKey, WorkItemId,
};
pub use plugin::{
    work_item_id_or_none, ConfigValidation, DecryptedPluginInstance, ParseOutcome, ParseResult,
    Plugin, PluginCategory, PluginError, PluginRegistry, PluginResult, SkipReason,
    StaticPluginRegistry, WebhookRequest, WebhookResponse,
};
pub use work_item::{Actor, ActorKind, WorkItem, WorkItemStatus};
