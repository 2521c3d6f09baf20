//! The per-invocation context handed to every handler in a hook's chain.

use switchyard_core::{DispatchId, PluginInstanceId, WorkItemId};

use crate::name::HookName;

/// Everything a handler sees for one hook invocation (§4.F step 3).
#[derive(Debug, Clone)]
pub struct HookContext {
    /// Which hook point this is.
    pub hook_name: HookName,
    /// The plugin instance this handler belongs to.
    pub plugin_id: PluginInstanceId,
    /// The work item this invocation concerns, if any.
    pub work_item_id: Option<WorkItemId>,
    /// The run dispatch this invocation concerns, if any.
    pub job_id: Option<DispatchId>,
    /// The target agent, if known at this point.
    pub agent_id: Option<String>,
    /// The running payload, shallow-merged across the chain (§4.F step 3
    /// "continue with optional data mutations").
    pub data: serde_json::Value,
}

impl HookContext {
    /// Build a context with an empty `{}` payload.
    #[must_use]
    pub fn new(hook_name: HookName, plugin_id: PluginInstanceId) -> Self {
        Self {
            hook_name,
            plugin_id,
            work_item_id: None,
            job_id: None,
            agent_id: None,
            data: serde_json::json!({}),
        }
    }

    /// Attach a work item (builder-style).
    #[must_use]
    pub fn with_work_item(mut self, id: WorkItemId) -> Self {
        self.work_item_id = Some(id);
        self
    }

    /// Attach a dispatch (builder-style).
    #[must_use]
    pub fn with_job(mut self, id: DispatchId) -> Self {
        self.job_id = Some(id);
        self
    }

    /// Attach an agent id (builder-style).
    #[must_use]
    pub fn with_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    /// Attach an initial payload (builder-style).
    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    /// Shallow-merge a handler's mutations into the running payload. Only
    /// object-shaped `data` merges key-by-key; anything else replaces the
    /// payload wholesale.
    pub fn merge(&mut self, mutations: serde_json::Value) {
        match (self.data.as_object_mut(), mutations) {
            (Some(existing), serde_json::Value::Object(incoming)) => {
                existing.extend(incoming);
            }
            (_, incoming) => self.data = incoming,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_shallow_merges_objects() {
        let mut ctx = HookContext::new(HookName::ToolPreExec, PluginInstanceId::new())
            .with_data(serde_json::json!({"a": 1, "b": 2}));
        ctx.merge(serde_json::json!({"b": 3, "c": 4}));
        assert_eq!(ctx.data, serde_json::json!({"a": 1, "b": 3, "c": 4}));
    }

    #[test]
    fn merge_replaces_when_incoming_is_not_an_object() {
        let mut ctx = HookContext::new(HookName::ToolPreExec, PluginInstanceId::new())
            .with_data(serde_json::json!({"a": 1}));
        ctx.merge(serde_json::json!("replaced"));
        assert_eq!(ctx.data, serde_json::json!("replaced"));
    }
}
