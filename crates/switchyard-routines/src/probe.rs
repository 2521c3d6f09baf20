//! Condition-trigger probes (§4.E "Condition triggers").
//!
//! A probe implementation (e.g. "stale PRs > N") is domain/plugin
//! specific, so it's resolved by name through an injectable registry the
//! same way [`switchyard_core::PluginRegistry`] resolves plugin handlers.

use async_trait::async_trait;

use crate::error::RoutineResult;

/// Evaluates a condition routine's probe against its stored config.
#[async_trait]
pub trait ConditionProbe: Send + Sync {
    /// Return whether the condition currently holds.
    async fn check(&self, config: &serde_json::Value) -> RoutineResult<bool>;
}

/// Resolves a routine's `condition_probe` name to its implementation.
pub trait ConditionProbeRegistry: Send + Sync {
    /// Look up the probe registered under `name`, if any.
    fn resolve(&self, name: &str) -> Option<std::sync::Arc<dyn ConditionProbe>>;
}
