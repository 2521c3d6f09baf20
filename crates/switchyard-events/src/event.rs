//! The pipeline event payload broadcast on the [`crate::EventBus`] and,
//! durably, persisted as `plugin_events` rows by `switchyard-audit` (§6
//! "Event-stream fields").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use switchyard_core::{PluginInstanceId, WorkItemId};

/// The closed `kind` vocabulary from §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineEventKind {
    /// An ingress webhook was accepted as new work.
    WebhookAccepted,
    /// An ingress webhook matched an existing idempotency key.
    WebhookDuplicate,
    /// An ingress webhook was skipped by policy.
    WebhookSkipped,
    /// An ingress webhook was rejected (bad plugin type / parse error).
    WebhookRejected,
    /// A hook invocation receipt.
    HookReceipt,
    /// A plugin instance loaded successfully.
    Load,
    /// A plugin instance unloaded.
    Unload,
    /// Crash Guard auto-disabled a plugin.
    AutoDisable,
}

impl PipelineEventKind {
    /// Map to the `kind` string used in the persisted `plugin_events` rows
    /// (§6's `kind ∈ {webhook_ingress, hook, load, unload, auto_disable}`);
    /// the ingress-specific variants above all collapse to `webhook_ingress`
    /// with distinct `status` values carried in [`PipelineEvent::detail`].
    #[must_use]
    pub fn persisted_kind(self) -> &'static str {
        match self {
            Self::WebhookAccepted
            | Self::WebhookDuplicate
            | Self::WebhookSkipped
            | Self::WebhookRejected => "webhook_ingress",
            Self::HookReceipt => "hook",
            Self::Load => "load",
            Self::Unload => "unload",
            Self::AutoDisable => "auto_disable",
        }
    }
}

/// One emitted pipeline event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineEvent {
    /// Unique event identifier (not persisted as a foreign key anywhere;
    /// purely for dedup in subscribers that care).
    pub id: Uuid,
    /// What happened.
    pub kind: PipelineEventKind,
    /// Which plugin this concerns, if applicable.
    pub plugin_instance_id: Option<PluginInstanceId>,
    /// Which work item this concerns, if applicable.
    pub work_item_id: Option<WorkItemId>,
    /// Free-form structured detail (reason codes, durations, errors).
    pub detail: serde_json::Value,
    /// When the event was produced.
    pub created_at: DateTime<Utc>,
}

impl PipelineEvent {
    /// Build a bare event with no plugin/work-item association and an
    /// empty detail object.
    #[must_use]
    pub fn new(kind: PipelineEventKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            plugin_instance_id: None,
            work_item_id: None,
            detail: serde_json::json!({}),
            created_at: Utc::now(),
        }
    }

    /// Attach a plugin instance (builder-style).
    #[must_use]
    pub fn with_plugin_instance(mut self, id: PluginInstanceId) -> Self {
        self.plugin_instance_id = Some(id);
        self
    }

    /// Attach a work item (builder-style).
    #[must_use]
    pub fn with_work_item(mut self, id: WorkItemId) -> Self {
        self.work_item_id = Some(id);
        self
    }

    /// Attach structured detail (builder-style).
    #[must_use]
    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = detail;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingress_kinds_collapse_to_webhook_ingress() {
        assert_eq!(
            PipelineEventKind::WebhookAccepted.persisted_kind(),
            "webhook_ingress"
        );
        assert_eq!(
            PipelineEventKind::WebhookDuplicate.persisted_kind(),
            "webhook_ingress"
        );
    }

    #[test]
    fn builder_methods_attach_fields() {
        let wi = WorkItemId::new();
        let event = PipelineEvent::new(PipelineEventKind::AutoDisable)
            .with_work_item(wi)
            .with_detail(serde_json::json!({"reason": "crash_loop"}));
        assert_eq!(event.work_item_id, Some(wi));
        assert_eq!(event.detail["reason"], "crash_loop");
    }
}
