//! End-to-end scenario tests over a real Postgres database.
//!
//! Scenarios that depend on live timing-sensitive background workers
//! (debounce timers actually elapsing, the claim-loop polling interval,
//! control-epoch reclaim within a lease period) are not exercised here —
//! asserting them deterministically without sleeps/races belongs in a
//! harness that drives a fake clock, which these crates don't expose.
//! What's covered:
//!
//! - a scoped admission-only version of the single-message scenario
//!   (Ingress accepts the webhook and the lane moves to `queued`), without
//!   asserting the dispatch/effect tail that only the `RunDispatcher` and
//!   `EffectOutbox` workers produce;
//! - dedup on redelivery, which is pure ingress logic;
//! - crash-loop auto-disable, which is pure `CrashGuard` logic.

mod common;

use std::collections::HashMap;

use switchyard_core::{PluginInstanceId, QueueKey, SessionKey, WorkItem};
use switchyard_ingress::{RouteOutcome, WebhookRequest};
use switchyard_storage::{plugins, queue, LaneState};
use switchyard_test::{test_actor, StubPlugin};

fn empty_request() -> WebhookRequest {
    WebhookRequest {
        body: Vec::new(),
        headers: HashMap::new(),
        query: HashMap::new(),
    }
}

#[tokio::test]
async fn single_message_is_accepted_and_the_lane_moves_to_queued() {
    let session_key = SessionKey::new("chatsvc:single-message-session");
    let work_item = WorkItem::new(
        PluginInstanceId::new(),
        session_key.clone(),
        "chatsvc",
        "hello",
        serde_json::json!({"text": "hello"}),
    )
    .with_actor(test_actor("user-1"));
    let harness = common::Harness::new(
        StubPlugin::new("chatsvc").with_process(work_item),
    )
    .await;

    let outcome = harness
        .router
        .route_webhook("chatsvc", harness.plugin_instance_id, empty_request())
        .await
        .unwrap();

    let work_item_id = match outcome {
        RouteOutcome::Created { work_item_id } => work_item_id,
        other => panic!("expected Created, got {other:?}"),
    };
    assert_ne!(work_item_id.to_string(), "");

    // The default stub config has no "agent_id" override, so Ingress falls
    // back to the plugin type tag.
    let queue_key = QueueKey::new(&session_key, "chatsvc");
    let lane = queue::get_or_create_lane(&harness.pool, &queue_key, 300, 50)
        .await
        .unwrap();
    assert_eq!(lane.state, LaneState::Queued);
    assert!(lane.debounce_until.is_some());
}

#[tokio::test]
async fn redelivery_with_an_overlapping_idempotency_key_is_reported_as_duplicate() {
    let work_item = WorkItem::new(
        PluginInstanceId::new(),
        SessionKey::new("chatsvc:dedup-session"),
        "chatsvc",
        "hello",
        serde_json::json!({"text": "hello"}),
    )
    .with_actor(test_actor("user-1"));
    let harness = common::Harness::new(StubPlugin::new("chatsvc").with_process_keys(
        work_item,
        vec!["a".to_string(), "b".to_string()],
        "evt-s3",
    ))
    .await;

    let first = harness
        .router
        .route_webhook("chatsvc", harness.plugin_instance_id, empty_request())
        .await
        .unwrap();
    let original_id = match first {
        RouteOutcome::Created { work_item_id } => work_item_id,
        other => panic!("expected Created on first delivery, got {other:?}"),
    };

    let second = harness
        .router
        .route_webhook("chatsvc", harness.plugin_instance_id, empty_request())
        .await
        .unwrap();

    match second {
        RouteOutcome::Duplicate { work_item_id } => assert_eq!(work_item_id, original_id),
        other => panic!("expected Duplicate on redelivery, got {other:?}"),
    }
}

#[tokio::test]
async fn five_hook_failures_within_the_window_auto_disable_the_plugin() {
    let harness = common::Harness::new(StubPlugin::new("chatsvc")).await;

    let guard = switchyard_crashguard::CrashGuard::new(
        harness.pool.clone(),
        std::sync::Arc::new(switchyard_audit::InMemoryAuditSink::new()),
        switchyard_crashguard::CrashGuardConfig::default(),
    );

    let mut tripped = false;
    for _ in 0..5 {
        tripped = guard
            .record_failure(harness.plugin_instance_id)
            .await
            .unwrap();
    }

    assert!(tripped, "fifth failure within the window should auto-disable");
    assert!(guard.is_disabled(harness.plugin_instance_id));

    let row = plugins::get_plugin_instance(&harness.pool, harness.plugin_instance_id)
        .await
        .unwrap();
    assert!(!row.enabled);
}
