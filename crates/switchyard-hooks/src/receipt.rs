//! Per-handler receipts, appended to the audit log (§4.F step 5).

use switchyard_core::PluginInstanceId;

use crate::name::HookName;

/// Outcome recorded for one handler invocation within a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    /// The handler returned `continue` or `block` within its timeout.
    Ok,
    /// The chain was stopped by this handler's `block` action.
    Blocked,
    /// The handler returned `Err` (threw).
    Error,
    /// The handler did not finish within `effectiveTimeout`.
    Timeout,
    /// The remaining event budget was already exhausted when this
    /// handler's turn came up.
    BudgetExceeded,
}

impl ReceiptStatus {
    /// Whether this status should notify Crash Guard (§4.F "Crash guard
    /// linkage": "every non-`ok` receipt").
    #[must_use]
    pub fn is_failure(self) -> bool {
        !matches!(self, Self::Ok)
    }
}

/// One `{pluginId, hookName, status, durationMs, error?}` receipt.
#[derive(Debug, Clone)]
pub struct HookReceipt {
    /// The plugin this handler belongs to.
    pub plugin_id: PluginInstanceId,
    /// The hook point invoked.
    pub hook_name: HookName,
    /// Outcome.
    pub status: ReceiptStatus,
    /// Wall-clock time spent in the handler (or until its timeout fired).
    pub duration_ms: u64,
    /// Error detail, for `error` receipts.
    pub error: Option<String>,
}
