//! Convenience re-exports for downstream crates.

pub use crate::backoff::{backoff_delay, is_retryable};
pub use crate::envelope::Envelope;
pub use crate::error::{CoreError, CoreResult};
pub use crate::ids::{
    DispatchId, EffectId, IdempotencyKey, PluginInstanceId, QueueKey, RoutineId, RoutineRunId,
    ScheduledItemId, SessionKey, WorkItemId,
};
pub use crate::plugin::{
    DecryptedPluginInstance, ParseOutcome, ParseResult, Plugin, PluginCategory, PluginRegistry,
    SkipReason, StaticPluginRegistry, WebhookRequest,
};
pub use crate::work_item::{Actor, ActorKind, WorkItem, WorkItemStatus};
