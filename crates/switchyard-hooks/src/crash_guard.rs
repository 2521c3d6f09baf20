//! The seam the Hook Pipeline uses to notify Crash Guard, kept as a trait
//! here so this crate doesn't depend on `switchyard-crashguard` (which in
//! turn depends on this crate's receipt types).

use async_trait::async_trait;

use switchyard_core::PluginInstanceId;

use crate::receipt::HookReceipt;

/// Notified once per handler invocation whose receipt was not `ok`
/// (§4.F "Crash guard linkage").
#[async_trait]
pub trait CrashGuardNotifier: Send + Sync {
    /// Record a failure for this plugin instance.
    async fn notify_failure(&self, plugin_id: PluginInstanceId, receipt: &HookReceipt);
}

/// A [`CrashGuardNotifier`] that does nothing, for tests and for running
/// the pipeline without a configured Crash Guard.
#[derive(Debug, Default)]
pub struct NoopCrashGuardNotifier;

#[async_trait]
impl CrashGuardNotifier for NoopCrashGuardNotifier {
    async fn notify_failure(&self, _plugin_id: PluginInstanceId, _receipt: &HookReceipt) {}
}
