//! Auto-disable: a plugin that fails `threshold` times within `window` is
//! disabled in memory and in storage until an operator re-enables it
//! (§4.G "Crash Guard").

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::{DashMap, DashSet};
use sqlx::PgPool;

use switchyard_audit::{AuditRecord, AuditSink};
use switchyard_core::PluginInstanceId;
use switchyard_events::{PipelineEvent, PipelineEventKind};
use switchyard_hooks::{CrashGuardNotifier, HookReceipt};

use crate::config::CrashGuardConfig;
use crate::error::CrashGuardResult;
use crate::window::FailureWindow;

/// Tracks a sliding window of failures per plugin instance and auto-disables
/// plugins that cross the threshold.
pub struct CrashGuard {
    pool: PgPool,
    audit: Arc<dyn AuditSink>,
    config: CrashGuardConfig,
    windows: DashMap<PluginInstanceId, FailureWindow>,
    disabled: DashSet<PluginInstanceId>,
}

impl CrashGuard {
    /// Construct a guard over `pool` (for the durable `enabled` flag) and
    /// `audit` (for the `auto_disable` event).
    #[must_use]
    pub fn new(pool: PgPool, audit: Arc<dyn AuditSink>, config: CrashGuardConfig) -> Self {
        Self {
            pool,
            audit,
            config,
            windows: DashMap::new(),
            disabled: DashSet::new(),
        }
    }

    /// Fast in-memory check, for callers on the hot path that want to skip
    /// dispatch entirely for a known-disabled plugin.
    #[must_use]
    pub fn is_disabled(&self, plugin_id: PluginInstanceId) -> bool {
        self.disabled.contains(&plugin_id)
    }

    /// Record a failure for `plugin_id`. Returns `true` if this call tripped
    /// auto-disable.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CrashGuardError`] if marking the plugin disabled in
    /// storage, or persisting the `auto_disable` event, fails.
    pub async fn record_failure(&self, plugin_id: PluginInstanceId) -> CrashGuardResult<bool> {
        let now = Utc::now();
        let count = {
            let mut entry = self.windows.entry(plugin_id).or_default();
            entry.record_failure(now, self.config.window)
        };

        if count < self.config.threshold {
            return Ok(false);
        }

        self.disabled.insert(plugin_id);
        switchyard_storage::plugins::set_enabled(&self.pool, plugin_id, false).await?;
        if let Some(mut entry) = self.windows.get_mut(&plugin_id) {
            entry.clear();
        }

        let event = PipelineEvent::new(PipelineEventKind::AutoDisable)
            .with_plugin_instance(plugin_id)
            .with_detail(serde_json::json!({
                "status": "error",
                "reason": "crash_loop",
                "threshold": self.config.threshold,
                "windowSecs": self.config.window.num_seconds(),
            }));
        self.audit.record(AuditRecord::from_event(&event, None)).await?;

        Ok(true)
    }

    /// Record a success, clearing the plugin's failure buffer.
    pub fn record_success(&self, plugin_id: PluginInstanceId) {
        if let Some(mut entry) = self.windows.get_mut(&plugin_id) {
            entry.clear();
        }
    }

    /// Operator re-enable: clears the in-memory disabled flag and failure
    /// buffer, and restores the storage `enabled` flag.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CrashGuardError`] if storage rejects the update.
    pub async fn reenable(&self, plugin_id: PluginInstanceId) -> CrashGuardResult<()> {
        switchyard_storage::plugins::set_enabled(&self.pool, plugin_id, true).await?;
        self.disabled.remove(&plugin_id);
        if let Some(mut entry) = self.windows.get_mut(&plugin_id) {
            entry.clear();
        }
        Ok(())
    }
}

#[async_trait]
impl CrashGuardNotifier for CrashGuard {
    async fn notify_failure(&self, plugin_id: PluginInstanceId, receipt: &HookReceipt) {
        match self.record_failure(plugin_id).await {
            Ok(true) => {
                tracing::warn!(
                    plugin_id = %plugin_id,
                    hook = %receipt.hook_name,
                    "auto-disabled plugin after repeated hook failures"
                );
            }
            Ok(false) => {}
            Err(err) => {
                tracing::error!(
                    plugin_id = %plugin_id,
                    error = %err,
                    "failed to record hook failure for crash guard"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_disabled_defaults_to_false_for_an_unseen_plugin() {
        let disabled: DashSet<PluginInstanceId> = DashSet::new();
        assert!(!disabled.contains(&PluginInstanceId::new()));
    }
}
