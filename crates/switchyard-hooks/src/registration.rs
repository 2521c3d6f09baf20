//! One handler's registration against a hook name.

use std::sync::Arc;

use switchyard_core::PluginInstanceId;

use crate::handler::HookHandler;
use crate::name::HookName;

/// How the pipeline behaves when this handler errors, times out, or the
/// per-event budget is exhausted (§4.F step 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPolicy {
    /// Record a non-`ok` receipt and continue the chain.
    FailOpen,
    /// Record a non-`ok` receipt and stop the chain.
    FailClosed,
}

/// One `{pluginId, hookName, handler, priority, failPolicy, timeoutMs}`
/// registration (§4.F "Registration").
#[derive(Clone)]
pub struct HookRegistration {
    /// Owning plugin instance.
    pub plugin_id: PluginInstanceId,
    /// Hook point this fires on.
    pub hook_name: HookName,
    /// The handler body.
    pub handler: Arc<dyn HookHandler>,
    /// Higher runs first. Ties broken by `plugin_id` lexicographically,
    /// then registration order (§4.F "Registration").
    pub priority: i32,
    /// Behavior on error/timeout/budget-exhaustion.
    pub fail_policy: FailPolicy,
    /// Per-call timeout ceiling, further bounded by the event's remaining
    /// budget at dispatch time.
    pub timeout_ms: u64,
}

impl HookRegistration {
    /// Build a registration with the given handler and defaults
    /// (`priority=0`, `fail_policy=FailOpen`, `timeout_ms=5000`).
    #[must_use]
    pub fn new(
        plugin_id: PluginInstanceId,
        hook_name: HookName,
        handler: Arc<dyn HookHandler>,
    ) -> Self {
        Self {
            plugin_id,
            hook_name,
            handler,
            priority: 0,
            fail_policy: FailPolicy::FailOpen,
            timeout_ms: 5_000,
        }
    }

    /// Set the priority (builder-style).
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the fail policy (builder-style).
    #[must_use]
    pub fn with_fail_policy(mut self, policy: FailPolicy) -> Self {
        self.fail_policy = policy;
        self
    }

    /// Set the timeout in milliseconds (builder-style).
    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

/// Sort registrations by the §4.F tie-break rule: priority descending,
/// then `plugin_id` lexicographically, then original registration order
/// (a stable sort preserves the latter automatically).
pub fn ordered(mut registrations: Vec<HookRegistration>) -> Vec<HookRegistration> {
    registrations.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| a.plugin_id.to_string().cmp(&b.plugin_id.to_string()))
    });
    registrations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{HookHandlerError, HookOutcome};
    use crate::name::HookName;
    use async_trait::async_trait;

    struct NoopHandler;

    #[async_trait]
    impl HookHandler for NoopHandler {
        async fn call(
            &self,
            _context: &crate::context::HookContext,
        ) -> Result<HookOutcome, HookHandlerError> {
            Ok(HookOutcome::continue_())
        }
    }

    fn reg(plugin_id: PluginInstanceId, priority: i32) -> HookRegistration {
        HookRegistration::new(plugin_id, HookName::ToolPreExec, Arc::new(NoopHandler))
            .with_priority(priority)
    }

    #[test]
    fn orders_by_priority_descending() {
        let low = reg(PluginInstanceId::new(), 1);
        let high = reg(PluginInstanceId::new(), 10);
        let ordered = ordered(vec![low.clone(), high.clone()]);
        assert_eq!(ordered[0].priority, 10);
        assert_eq!(ordered[1].priority, 1);
    }

    #[test]
    fn breaks_ties_by_plugin_id_lexicographically() {
        let mut ids = [PluginInstanceId::new(), PluginInstanceId::new()];
        ids.sort_by_key(ToString::to_string);
        let first = reg(ids[0], 5);
        let second = reg(ids[1], 5);
        let ordered = ordered(vec![second.clone(), first.clone()]);
        assert_eq!(ordered[0].plugin_id, ids[0]);
        assert_eq!(ordered[1].plugin_id, ids[1]);
    }
}
