//! Builder functions for commonly-needed test data.

use switchyard_core::{Actor, ActorKind, PluginInstanceId, SessionKey, WorkItem};

/// A work item from a fresh plugin instance and session key, with a default
/// `"chatsvc"` source and `{"text": "hello"}` payload.
#[must_use]
pub fn test_work_item() -> WorkItem {
    WorkItem::new(
        PluginInstanceId::new(),
        SessionKey::new("chatsvc:test-session"),
        "chatsvc",
        "test work item",
        serde_json::json!({"text": "hello"}),
    )
}

/// A work item addressed to a specific plugin instance and session key.
#[must_use]
pub fn test_work_item_for(plugin_instance_id: PluginInstanceId, session_key: &str) -> WorkItem {
    WorkItem::new(
        plugin_instance_id,
        SessionKey::new(session_key),
        "chatsvc",
        "test work item",
        serde_json::json!({"text": "hello"}),
    )
}

/// A resolved `User` actor with the given handle.
#[must_use]
pub fn test_actor(handle: &str) -> Actor {
    Actor {
        kind: ActorKind::User,
        handle: handle.to_string(),
        display_name: None,
    }
}

/// A minimal plugin instance config blob accepted by [`crate::plugins::StubPlugin`]'s
/// `validate_config`.
#[must_use]
pub fn test_plugin_config() -> serde_json::Value {
    serde_json::json!({"token": "test-token"})
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_item_starts_in_new_status() {
        let item = test_work_item();
        assert_eq!(item.status, switchyard_core::WorkItemStatus::New);
    }

    #[test]
    fn test_work_item_for_uses_given_plugin_and_session() {
        let plugin_id = PluginInstanceId::new();
        let item = test_work_item_for(plugin_id, "repo:acme/x#42");
        assert_eq!(item.plugin_instance_id, plugin_id);
        assert_eq!(item.session_key.as_str(), "repo:acme/x#42");
    }
}
