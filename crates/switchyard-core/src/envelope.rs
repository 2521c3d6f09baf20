//! The canonical envelope used by the routine predicate engine (§4.E).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{PluginInstanceId, SessionKey, WorkItemId};
use crate::work_item::{ActorKind, WorkItem, WorkItemStatus};

/// Canonical structured view of an event, built from a [`WorkItem`] (or a
/// routine event queue entry) so rule predicates have a stable, typed field
/// set to evaluate against regardless of which plugin produced the event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Unique event identifier (usually the work item ID as a string).
    pub event_id: String,
    /// Source system (e.g. `"chatsvc"`, `"github"`).
    pub source: String,
    /// Event type (e.g. `"message"`, `"pull_request.opened"`).
    pub event_type: String,
    /// Source-specific reference.
    pub source_ref: Option<String>,
    /// Conversation shard key.
    pub session_key: SessionKey,
    /// Which plugin instance produced this event.
    pub plugin_instance_id: PluginInstanceId,
    /// Kind of actor, if resolved.
    pub actor_kind: Option<ActorKind>,
    /// Actor handle, if resolved.
    pub actor_handle: Option<String>,
    /// Work item status at envelope construction time.
    pub status: WorkItemStatus,
    /// Short title.
    pub title: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Envelope {
    /// Build an envelope from a work item and an explicit event type
    /// (work items don't carry `event_type` themselves — it's supplied by
    /// whichever caller is evaluating routines against this item).
    #[must_use]
    pub fn from_work_item(item: &WorkItem, event_type: impl Into<String>) -> Self {
        Self {
            event_id: item.id.to_string(),
            source: item.source.clone(),
            event_type: event_type.into(),
            source_ref: item.source_ref.clone(),
            session_key: item.session_key.clone(),
            plugin_instance_id: item.plugin_instance_id,
            actor_kind: item.actor.as_ref().map(|a| a.kind),
            actor_handle: item.actor.as_ref().map(|a| a.handle.clone()),
            status: item.status,
            title: item.title.clone(),
            created_at: item.created_at,
        }
    }

    /// Look up a field by the name used in rule JSON (`field` in a Leaf
    /// rule). Returns `None` for unknown field names or fields that are
    /// absent/null on this envelope, matching the `exists` operator's
    /// semantics of "present and non-null".
    #[must_use]
    pub fn field(&self, name: &str) -> Option<String> {
        match name {
            "eventId" => Some(self.event_id.clone()),
            "source" => Some(self.source.clone()),
            "eventType" => Some(self.event_type.clone()),
            "sourceRef" => self.source_ref.clone(),
            "sessionKey" => Some(self.session_key.as_str().to_string()),
            "pluginInstanceId" => Some(self.plugin_instance_id.to_string()),
            "actorKind" => self.actor_kind.map(|k| format!("{k:?}").to_lowercase()),
            "actorHandle" => self.actor_handle.clone(),
            "status" => Some(self.status.to_string()),
            "title" => Some(self.title.clone()),
            "createdAt" => Some(self.created_at.timestamp_millis().to_string()),
            _ => None,
        }
    }

    /// Whether the named field is present and non-null, for the `exists`
    /// operator.
    #[must_use]
    pub fn field_exists(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Fields referenced by a work-item-shaped ingress event, also used as
    /// the canonical reference list for validating rule JSON at
    /// configuration time (§4.E).
    pub const FIELD_NAMES: &'static [&'static str] = &[
        "eventId",
        "source",
        "eventType",
        "sourceRef",
        "sessionKey",
        "pluginInstanceId",
        "actorKind",
        "actorHandle",
        "status",
        "title",
        "createdAt",
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::PluginInstanceId;
    use crate::work_item::{Actor, WorkItem};

    fn sample_item() -> WorkItem {
        WorkItem::new(
            PluginInstanceId::new(),
            SessionKey::new("chatsvc:1"),
            "chatsvc",
            "hello",
            serde_json::json!({}),
        )
        .with_actor(Actor {
            kind: ActorKind::User,
            handle: "alice".into(),
            display_name: None,
        })
    }

    #[test]
    fn field_lookup_returns_known_fields() {
        let env = Envelope::from_work_item(&sample_item(), "message");
        assert_eq!(env.field("source").as_deref(), Some("chatsvc"));
        assert_eq!(env.field("actorHandle").as_deref(), Some("alice"));
        assert_eq!(env.field("eventType").as_deref(), Some("message"));
    }

    #[test]
    fn field_lookup_returns_none_for_absent_and_unknown() {
        let env = Envelope::from_work_item(&sample_item(), "message");
        assert_eq!(env.field("sourceRef"), None);
        assert_eq!(env.field("bogus"), None);
    }

    #[test]
    fn field_exists_matches_presence() {
        let env = Envelope::from_work_item(&sample_item(), "message");
        assert!(env.field_exists("actorHandle"));
        assert!(!env.field_exists("sourceRef"));
    }
}
