//! Tests for individual invariants, as distinct from full end-to-end
//! scenarios (see `scenarios.rs`).
//!
//! Not every invariant is exercised at this layer: "at most one `running`
//! dispatch per queue_key", "claimed_epoch monotonically non-decreasing",
//! and the effect/provider_ref uniqueness invariant all live inside the
//! `RunDispatcher`/`EffectOutbox` claim loops, which need the background
//! workers actually running against real wall-clock time to observe.

mod common;

use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use switchyard_core::PluginInstanceId;
use switchyard_hooks::{
    HookContext, HookDispatcher, HookHandler, HookHandlerError, HookName, HookOutcome,
    HookRegistration, NoopCrashGuardNotifier,
};
use switchyard_storage::work_items;
use switchyard_test::{test_actor, test_work_item};

#[tokio::test]
async fn duplicate_idempotency_keys_across_work_items_are_rejected_by_storage() {
    let harness = common::Harness::new(switchyard_test::StubPlugin::new("chatsvc")).await;

    let first_item = test_work_item();
    let mut tx = harness.pool.begin().await.unwrap();
    work_items::insert_work_item(&mut tx, &first_item).await.unwrap();
    work_items::insert_idempotency_keys(&mut tx, first_item.id, &["shared-key".to_string()])
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let second_item = test_work_item();
    let mut tx = harness.pool.begin().await.unwrap();
    work_items::insert_work_item(&mut tx, &second_item).await.unwrap();
    let result =
        work_items::insert_idempotency_keys(&mut tx, second_item.id, &["shared-key".to_string()])
            .await;

    assert!(
        result.is_err(),
        "a second work item must not be able to claim an already-used idempotency key"
    );
}

/// Records the order in which it was invoked, always continuing.
struct RecordingHandler {
    label: &'static str,
    order: Arc<Mutex<Vec<&'static str>>>,
}

#[async_trait]
impl HookHandler for RecordingHandler {
    async fn call(&self, _context: &HookContext) -> Result<HookOutcome, HookHandlerError> {
        self.order.lock().unwrap().push(self.label);
        Ok(HookOutcome::continue_())
    }
}

#[tokio::test]
async fn hook_receipts_are_produced_in_handler_invocation_order() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let plugin_a = PluginInstanceId::new();
    let plugin_b = PluginInstanceId::new();
    let plugin_c = PluginInstanceId::new();

    let registrations = vec![
        HookRegistration::new(
            plugin_a,
            HookName::WorkItemPreCreate,
            Arc::new(RecordingHandler { label: "low", order: order.clone() }),
        )
        .with_priority(0),
        HookRegistration::new(
            plugin_b,
            HookName::WorkItemPreCreate,
            Arc::new(RecordingHandler { label: "high", order: order.clone() }),
        )
        .with_priority(10),
        HookRegistration::new(
            plugin_c,
            HookName::WorkItemPreCreate,
            Arc::new(RecordingHandler { label: "mid", order: order.clone() }),
        )
        .with_priority(5),
    ];

    let audit = Arc::new(switchyard_audit::InMemoryAuditSink::new());
    let dispatcher = HookDispatcher::new(registrations, audit, Arc::new(NoopCrashGuardNotifier));

    let context = HookContext::new(HookName::WorkItemPreCreate, plugin_a)
        .with_work_item(test_work_item().id)
        .with_agent(test_actor("user-1").handle);

    let outcome = dispatcher.dispatch(context).await;

    assert!(!outcome.blocked);
    assert_eq!(outcome.receipts.len(), 3);
    // Higher priority runs first: "high" (10), "mid" (5), "low" (0).
    let receipt_order: Vec<PluginInstanceId> =
        outcome.receipts.iter().map(|r| r.plugin_id).collect();
    assert_eq!(receipt_order, vec![plugin_b, plugin_c, plugin_a]);
    assert_eq!(*order.lock().unwrap(), vec!["high", "mid", "low"]);
}
