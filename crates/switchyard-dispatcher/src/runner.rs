//! The agent runner seam (§4.C step 4: "Invoke the agent runner (external
//! collaborator)"). Running an agent to completion is out of scope for this
//! crate; we only define the contract the worker loop drives.

use async_trait::async_trait;
use thiserror::Error;

use switchyard_core::{DispatchId, PluginInstanceId, QueueKey, SessionKey, WorkItemId};

/// One effect an agent run wants delivered via the Effect Outbox.
#[derive(Debug, Clone)]
pub struct EffectRequest {
    /// Idempotency key, unique across the outbox.
    pub effect_key: String,
    /// Plugin instance to deliver through.
    pub plugin_instance_id: PluginInstanceId,
    /// Delivery channel (e.g. a chat channel ID).
    pub channel: String,
    /// Effect kind (e.g. `"message"`, `"media"`).
    pub kind: String,
    /// Opaque delivery payload.
    pub payload: serde_json::Value,
}

/// Everything an [`AgentRunner`] needs to execute one dispatch.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// The dispatch row being executed.
    pub dispatch_id: DispatchId,
    /// The lane this dispatch belongs to.
    pub queue_key: QueueKey,
    /// Source work item.
    pub work_item_id: WorkItemId,
    /// Agent to invoke.
    pub agent_id: String,
    /// Session shard key.
    pub session_key: SessionKey,
    /// Text actually handed to the agent (may fold several messages).
    pub coalesced_text: String,
}

/// A successful run's result.
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    /// Effects to enqueue on the Effect Outbox, in the same step as marking
    /// the dispatch `completed`.
    pub effects: Vec<EffectRequest>,
    /// Free-form detail recorded alongside completion, for audit/debugging.
    pub detail: serde_json::Value,
}

/// A run that did not complete successfully.
#[derive(Debug, Error, Clone)]
#[error("agent run failed: {message}")]
pub struct RunError {
    /// Human-readable failure description.
    pub message: String,
    /// Whether the Run Dispatcher should requeue this dispatch with backoff
    /// (§4.C step 7).
    pub retryable: bool,
}

impl RunError {
    /// A failure worth retrying.
    #[must_use]
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    /// A failure that will never succeed on retry.
    #[must_use]
    pub fn terminal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }
}

/// The external collaborator that actually invokes an agent (§4.C step 4).
#[async_trait]
pub trait AgentRunner: Send + Sync {
    /// Execute `request` to completion, or return a [`RunError`]. The
    /// worker loop races this future against its own control-state poll
    /// (§4.C step 5) and drops it once a pause/cancel or epoch fence is
    /// observed, so implementations don't need to poll control themselves.
    async fn run(&self, request: &RunRequest) -> Result<RunOutcome, RunError>;
}
