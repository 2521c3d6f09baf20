//! The persisted shape of a `plugin_events` row (§3/§6 "Event-stream
//! fields").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use switchyard_core::{PluginInstanceId, WorkItemId};
use switchyard_events::{PipelineEvent, PipelineEventKind};

/// One durable audit record. Distinct from [`PipelineEvent`]: this carries
/// the flattened `kind`/`status` pair the event-stream query surface (§6)
/// expects, plus the plugin version that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Primary key.
    pub id: Uuid,
    /// Which plugin instance, if any.
    pub plugin_instance_id: Option<PluginInstanceId>,
    /// Plugin version string, if known at record time.
    pub plugin_version: Option<String>,
    /// Top-level kind (`webhook_ingress`, `hook`, `load`, `unload`,
    /// `auto_disable`).
    pub kind: String,
    /// Fine-grained status (e.g. `accepted`, `duplicate`, a skip/reject
    /// reason code, or a hook outcome).
    pub status: String,
    /// Work item this concerns, if any.
    pub work_item_id: Option<WorkItemId>,
    /// Structured detail payload.
    pub detail_json: serde_json::Value,
    /// When the underlying event occurred.
    pub created_at: DateTime<Utc>,
}

impl AuditRecord {
    /// Flatten a [`PipelineEvent`] into its persisted row shape. The
    /// `status` defaults to the event kind's own tag (e.g. `accepted` for
    /// [`PipelineEventKind::WebhookAccepted`]); callers that already carry a
    /// more specific reason code in `detail.status` should prefer that.
    #[must_use]
    pub fn from_event(event: &PipelineEvent, plugin_version: Option<String>) -> Self {
        let status = event
            .detail
            .get("status")
            .and_then(|v| v.as_str())
            .map(ToString::to_string)
            .unwrap_or_else(|| default_status(event.kind));

        Self {
            id: event.id,
            plugin_instance_id: event.plugin_instance_id,
            plugin_version,
            kind: event.kind.persisted_kind().to_string(),
            status,
            work_item_id: event.work_item_id,
            detail_json: event.detail.clone(),
            created_at: event.created_at,
        }
    }
}

fn default_status(kind: PipelineEventKind) -> String {
    match kind {
        PipelineEventKind::WebhookAccepted => "accepted",
        PipelineEventKind::WebhookDuplicate => "duplicate",
        PipelineEventKind::WebhookSkipped => "skipped",
        PipelineEventKind::WebhookRejected => "rejected",
        PipelineEventKind::HookReceipt => "receipt",
        PipelineEventKind::Load => "loaded",
        PipelineEventKind::Unload => "unloaded",
        PipelineEventKind::AutoDisable => "disabled",
    }
    .to_string()
}

/// Filter for [`crate::AuditSink::query`].
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    /// Restrict to a single plugin instance.
    pub plugin_instance_id: Option<PluginInstanceId>,
    /// Restrict to a single top-level kind (e.g. `"hook"`).
    pub kind: Option<String>,
    /// Only records at or after this time.
    pub since: Option<DateTime<Utc>>,
    /// Maximum rows to return, newest first.
    pub limit: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattens_status_from_kind_when_absent() {
        let event = PipelineEvent::new(PipelineEventKind::WebhookDuplicate);
        let record = AuditRecord::from_event(&event, None);
        assert_eq!(record.status, "duplicate");
        assert_eq!(record.kind, "webhook_ingress");
    }

    #[test]
    fn prefers_explicit_status_in_detail() {
        let event = PipelineEvent::new(PipelineEventKind::WebhookSkipped)
            .with_detail(serde_json::json!({"status": "skipped(no_work_item)"}));
        let record = AuditRecord::from_event(&event, None);
        assert_eq!(record.status, "skipped(no_work_item)");
    }
}
