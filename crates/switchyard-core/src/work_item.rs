//! The work item entity (§3 "Work item").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{PluginInstanceId, SessionKey, WorkItemId};

/// Lifecycle status of a work item. Never destroyed — status transitions
/// are driven by the Run Dispatcher and higher layers, but the row itself
/// is kept for audit history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkItemStatus {
    /// Freshly ingested, not yet claimed by any dispatch.
    New,
    /// Currently being acted on by a run.
    InProgress,
    /// All associated runs finished successfully.
    Completed,
    /// The associated run(s) failed terminally.
    Failed,
    /// Work was cancelled before or during processing.
    Cancelled,
}

impl std::fmt::Display for WorkItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::New => "new",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// What kind of actor originated an inbound event, used to populate the
/// routine predicate envelope's `actorKind` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    /// A human user.
    User,
    /// Another bot/automation.
    Bot,
    /// A system-generated event (e.g. CI, webhook relay) with no human
    /// behind it.
    System,
}

/// Canonical actor envelope produced by a plugin handler's `ParseResult`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Coarse kind of actor.
    pub kind: ActorKind,
    /// Platform-specific handle/username/ID.
    pub handle: String,
    /// Human-readable display name, if different from `handle`.
    pub display_name: Option<String>,
}

/// One inbound actionable event, as enumerated in §3.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Unique identifier.
    pub id: WorkItemId,
    /// The plugin instance this event arrived through.
    pub plugin_instance_id: PluginInstanceId,
    /// Shard key for the conversation this event belongs to.
    pub session_key: SessionKey,
    /// Which external system produced this event (e.g. `"chatsvc"`,
    /// `"github"`).
    pub source: String,
    /// Source-specific reference (e.g. a platform message ID or PR URL).
    pub source_ref: Option<String>,
    /// Current lifecycle status.
    pub status: WorkItemStatus,
    /// Short human-readable title, for logs/admin UIs.
    pub title: String,
    /// Opaque structured payload as parsed by the plugin handler.
    pub payload: serde_json::Value,
    /// The actor who produced this event, if resolved.
    pub actor: Option<Actor>,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
    /// When the row was last updated.
    pub updated_at: DateTime<Utc>,
}

impl WorkItem {
    /// Construct a new work item in `New` status, stamped with the current
    /// time.
    #[must_use]
    pub fn new(
        plugin_instance_id: PluginInstanceId,
        session_key: SessionKey,
        source: impl Into<String>,
        title: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: WorkItemId::new(),
            plugin_instance_id,
            session_key,
            source: source.into(),
            source_ref: None,
            status: WorkItemStatus::New,
            title: title.into(),
            payload,
            actor: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Attach a source reference (builder-style).
    #[must_use]
    pub fn with_source_ref(mut self, source_ref: impl Into<String>) -> Self {
        self.source_ref = Some(source_ref.into());
        self
    }

    /// Attach an actor (builder-style).
    #[must_use]
    pub fn with_actor(mut self, actor: Actor) -> Self {
        self.actor = Some(actor);
        self
    }

    /// Transition to a new status, bumping `updated_at`.
    pub fn transition(&mut self, status: WorkItemStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_work_item_starts_in_new_status() {
        let item = WorkItem::new(
            PluginInstanceId::new(),
            SessionKey::new("chatsvc:1"),
            "chatsvc",
            "hello",
            serde_json::json!({"text": "hi"}),
        );
        assert_eq!(item.status, WorkItemStatus::New);
        assert_eq!(item.created_at, item.updated_at);
    }

    #[test]
    fn transition_updates_status_and_timestamp() {
        let mut item = WorkItem::new(
            PluginInstanceId::new(),
            SessionKey::new("chatsvc:1"),
            "chatsvc",
            "hello",
            serde_json::Value::Null,
        );
        let created = item.created_at;
        item.transition(WorkItemStatus::Completed);
        assert_eq!(item.status, WorkItemStatus::Completed);
        assert_eq!(item.created_at, created);
    }

    #[test]
    fn status_display_matches_closed_vocabulary() {
        assert_eq!(WorkItemStatus::New.to_string(), "new");
        assert_eq!(WorkItemStatus::InProgress.to_string(), "in_progress");
        assert_eq!(WorkItemStatus::Cancelled.to_string(), "cancelled");
    }
}
