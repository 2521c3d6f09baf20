//! Dispatch: runs one hook's ordered handler chain under a cumulative
//! event budget (§4.F "Dispatch", "Budget").

use std::sync::Arc;
use std::time::{Duration, Instant};

use switchyard_audit::{AuditRecord, AuditSink};
use switchyard_events::{PipelineEvent, PipelineEventKind};

use crate::context::HookContext;
use crate::crash_guard::CrashGuardNotifier;
use crate::handler::HookAction;
use crate::name::HookName;
use crate::receipt::{HookReceipt, ReceiptStatus};
use crate::registration::{ordered, FailPolicy, HookRegistration};

/// Default cumulative budget for one hook invocation (§4.F "Budget").
pub const DEFAULT_BUDGET_MS: u64 = 8_000;

/// Result of running a hook's full handler chain.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    /// The final payload after all handlers' mutations were merged.
    pub data: serde_json::Value,
    /// Whether some handler blocked the chain.
    pub blocked: bool,
    /// One receipt per handler actually considered (including budget/
    /// fail-closed stops).
    pub receipts: Vec<HookReceipt>,
}

/// Runs registered handlers for one hook name against a shared budget.
pub struct HookDispatcher {
    registrations: Vec<HookRegistration>,
    audit: Arc<dyn AuditSink>,
    crash_guard: Arc<dyn CrashGuardNotifier>,
    budget_ms: u64,
}

impl HookDispatcher {
    /// Build a dispatcher over an already-ordered or unordered set of
    /// registrations (sorted internally per §4.F's tie-break rule).
    #[must_use]
    pub fn new(
        registrations: Vec<HookRegistration>,
        audit: Arc<dyn AuditSink>,
        crash_guard: Arc<dyn CrashGuardNotifier>,
    ) -> Self {
        Self {
            registrations: ordered(registrations),
            audit,
            crash_guard,
            budget_ms: DEFAULT_BUDGET_MS,
        }
    }

    /// Override the default cumulative budget (builder-style).
    #[must_use]
    pub fn with_budget_ms(mut self, budget_ms: u64) -> Self {
        self.budget_ms = budget_ms;
        self
    }

    /// Run every registered handler for `context.hook_name`, in priority
    /// order, against `context`.
    pub async fn dispatch(&self, mut context: HookContext) -> DispatchOutcome {
        let handlers: Vec<&HookRegistration> = self
            .registrations
            .iter()
            .filter(|r| r.hook_name == context.hook_name)
            .collect();

        let mut remaining_budget_ms = i64::try_from(self.budget_ms).unwrap_or(i64::MAX);
        let mut receipts = Vec::with_capacity(handlers.len());
        let mut blocked = false;

        for registration in handlers {
            if remaining_budget_ms <= 0 {
                let receipt = HookReceipt {
                    plugin_id: registration.plugin_id,
                    hook_name: context.hook_name,
                    status: ReceiptStatus::BudgetExceeded,
                    duration_ms: 0,
                    error: None,
                };
                self.finish_receipt(&receipt).await;
                receipts.push(receipt);
                if registration.fail_policy == FailPolicy::FailClosed {
                    break;
                }
                continue;
            }

            let effective_timeout_ms =
                u64::try_from(remaining_budget_ms).unwrap_or(u64::MAX).min(registration.timeout_ms);
            let timeout = Duration::from_millis(effective_timeout_ms);

            let started = Instant::now();
            let call_result =
                tokio::time::timeout(timeout, registration.handler.call(&context)).await;
            let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
            remaining_budget_ms -= i64::try_from(elapsed_ms).unwrap_or(0);

            let receipt = match call_result {
                Ok(Ok(outcome)) => {
                    context.merge(outcome.data);
                    let status = match outcome.action {
                        HookAction::Continue => ReceiptStatus::Ok,
                        HookAction::Block => ReceiptStatus::Blocked,
                    };
                    if matches!(outcome.action, HookAction::Block) {
                        blocked = true;
                    }
                    HookReceipt {
                        plugin_id: registration.plugin_id,
                        hook_name: context.hook_name,
                        status,
                        duration_ms: elapsed_ms,
                        error: None,
                    }
                }
                Ok(Err(err)) => HookReceipt {
                    plugin_id: registration.plugin_id,
                    hook_name: context.hook_name,
                    status: ReceiptStatus::Error,
                    duration_ms: elapsed_ms,
                    error: Some(err.0),
                },
                Err(_elapsed) => HookReceipt {
                    plugin_id: registration.plugin_id,
                    hook_name: context.hook_name,
                    status: ReceiptStatus::Timeout,
                    duration_ms: elapsed_ms,
                    error: None,
                },
            };

            self.finish_receipt(&receipt).await;
            let stop = blocked
                || (receipt.status.is_failure()
                    && registration.fail_policy == FailPolicy::FailClosed);
            receipts.push(receipt);
            if stop {
                break;
            }
        }

        DispatchOutcome {
            data: context.data,
            blocked,
            receipts,
        }
    }

    async fn finish_receipt(&self, receipt: &HookReceipt) {
        if receipt.status.is_failure() {
            self.crash_guard
                .notify_failure(receipt.plugin_id, receipt)
                .await;
        }

        let audit = Arc::clone(&self.audit);
        let record = AuditRecord::from_event(&to_event(receipt), None);
        tokio::spawn(async move {
            if let Err(err) = audit.record(record).await {
                tracing::warn!(error = %err, "failed to persist hook receipt");
            }
        });
    }
}

fn to_event(receipt: &HookReceipt) -> PipelineEvent {
    let status = match receipt.status {
        ReceiptStatus::Ok => "ok",
        ReceiptStatus::Blocked => "blocked",
        ReceiptStatus::Error => "error",
        ReceiptStatus::Timeout => "timeout",
        ReceiptStatus::BudgetExceeded => "budget_exceeded",
    };
    let mut detail = serde_json::json!({
        "hookName": receipt.hook_name.as_str(),
        "status": status,
        "durationMs": receipt.duration_ms,
    });
    if let Some(error) = &receipt.error {
        detail["error"] = serde_json::Value::String(error.clone());
    }

    PipelineEvent::new(PipelineEventKind::HookReceipt)
        .with_plugin_instance(receipt.plugin_id)
        .with_detail(detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{HookHandler, HookHandlerError, HookOutcome};
    use crate::name::HookName;
    use async_trait::async_trait;
    use switchyard_audit::InMemoryAuditSink;
    use switchyard_core::PluginInstanceId;

    struct ContinueHandler;

    #[async_trait]
    impl HookHandler for ContinueHandler {
        async fn call(&self, _context: &HookContext) -> Result<HookOutcome, HookHandlerError> {
            Ok(HookOutcome::continue_with(serde_json::json!({"seen": true})))
        }
    }

    struct BlockingHandler;

    #[async_trait]
    impl HookHandler for BlockingHandler {
        async fn call(&self, _context: &HookContext) -> Result<HookOutcome, HookHandlerError> {
            Ok(HookOutcome::block())
        }
    }

    struct SlowHandler;

    #[async_trait]
    impl HookHandler for SlowHandler {
        async fn call(&self, _context: &HookContext) -> Result<HookOutcome, HookHandlerError> {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(HookOutcome::continue_())
        }
    }

    fn dispatcher(registrations: Vec<HookRegistration>) -> HookDispatcher {
        HookDispatcher::new(
            registrations,
            Arc::new(InMemoryAuditSink::new()),
            Arc::new(crate::crash_guard::NoopCrashGuardNotifier),
        )
    }

    #[tokio::test]
    async fn continue_handlers_merge_and_do_not_block() {
        let plugin_id = PluginInstanceId::new();
        let reg =
            HookRegistration::new(plugin_id, HookName::ToolPreExec, Arc::new(ContinueHandler));
        let outcome = dispatcher(vec![reg])
            .dispatch(HookContext::new(HookName::ToolPreExec, plugin_id))
            .await;

        assert!(!outcome.blocked);
        assert_eq!(outcome.data, serde_json::json!({"seen": true}));
        assert_eq!(outcome.receipts.len(), 1);
        assert_eq!(outcome.receipts[0].status, ReceiptStatus::Ok);
    }

    #[tokio::test]
    async fn block_stops_the_chain() {
        let plugin_a = PluginInstanceId::new();
        let plugin_b = PluginInstanceId::new();
        let blocking =
            HookRegistration::new(plugin_a, HookName::ToolPreExec, Arc::new(BlockingHandler))
                .with_priority(10);
        let never_runs =
            HookRegistration::new(plugin_b, HookName::ToolPreExec, Arc::new(ContinueHandler))
                .with_priority(1);

        let outcome = dispatcher(vec![blocking, never_runs])
            .dispatch(HookContext::new(HookName::ToolPreExec, plugin_a))
            .await;

        assert!(outcome.blocked);
        assert_eq!(outcome.receipts.len(), 1);
        assert_eq!(outcome.receipts[0].status, ReceiptStatus::Blocked);
    }

    #[tokio::test]
    async fn timeout_produces_timeout_receipt_and_fail_open_continues() {
        let plugin_a = PluginInstanceId::new();
        let plugin_b = PluginInstanceId::new();
        let slow = HookRegistration::new(plugin_a, HookName::ToolPreExec, Arc::new(SlowHandler))
            .with_priority(10)
            .with_timeout_ms(10)
            .with_fail_policy(FailPolicy::FailOpen);
        let follow_up =
            HookRegistration::new(plugin_b, HookName::ToolPreExec, Arc::new(ContinueHandler))
                .with_priority(1);

        let outcome = dispatcher(vec![slow, follow_up])
            .dispatch(HookContext::new(HookName::ToolPreExec, plugin_a))
            .await;

        assert!(!outcome.blocked);
        assert_eq!(outcome.receipts.len(), 2);
        assert_eq!(outcome.receipts[0].status, ReceiptStatus::Timeout);
        assert_eq!(outcome.receipts[1].status, ReceiptStatus::Ok);
    }

    #[tokio::test]
    async fn exhausted_budget_emits_budget_exceeded_receipts() {
        let plugin_id = PluginInstanceId::new();
        let reg =
            HookRegistration::new(plugin_id, HookName::ToolPreExec, Arc::new(ContinueHandler));
        let outcome = dispatcher(vec![reg])
            .dispatch(HookContext::new(HookName::ToolPreExec, plugin_id))
            .await;
        assert_eq!(outcome.receipts[0].status, ReceiptStatus::Ok);

        let plugin_id2 = PluginInstanceId::new();
        let reg2 =
            HookRegistration::new(plugin_id2, HookName::ToolPreExec, Arc::new(ContinueHandler));
        let zero_budget = dispatcher(vec![reg2]).with_budget_ms(0);
        let outcome2 = zero_budget
            .dispatch(HookContext::new(HookName::ToolPreExec, plugin_id2))
            .await;
        assert_eq!(outcome2.receipts[0].status, ReceiptStatus::BudgetExceeded);
    }
}
