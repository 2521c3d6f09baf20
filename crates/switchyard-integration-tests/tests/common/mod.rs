//! Shared test harness wiring Ingress, the Session Queue, the Hook
//! Pipeline, and the Crash Guard over a real test database.

use std::sync::Arc;

use sqlx::PgPool;
use switchyard_audit::InMemoryAuditSink;
use switchyard_core::{PluginInstanceId, PluginRegistry, StaticPluginRegistry};
use switchyard_crypto::NoopDecoder;
use switchyard_events::EventBus;
use switchyard_hooks::{HookDispatcher, NoopCrashGuardNotifier};
use switchyard_ingress::IngressRouter;
use switchyard_queue::{SessionQueue, SessionQueueConfig};
use switchyard_storage::plugins;
use switchyard_test::StubPlugin;

/// A self-contained harness over a real test database: one plugin
/// instance registered with a [`StubPlugin`], wired into an
/// [`IngressRouter`] with an empty hook chain and an in-memory audit sink.
#[allow(dead_code)]
pub struct Harness {
    pub pool: PgPool,
    pub router: IngressRouter,
    pub plugin_instance_id: PluginInstanceId,
}

#[allow(dead_code)]
impl Harness {
    /// Build a harness with a single `"chatsvc"` plugin instance configured
    /// to process every webhook with the given stub behavior.
    pub async fn new(plugin: StubPlugin) -> Self {
        let pool = switchyard_test::connect_test_pool().await.unwrap();

        let plugin_instance_id = plugins::insert_plugin_instance(
            &pool,
            "chatsvc",
            "test instance",
            &switchyard_test::test_plugin_config(),
        )
        .await
        .unwrap();

        let registry: Arc<dyn PluginRegistry> =
            Arc::new(StaticPluginRegistry::new().with_handler(Arc::new(plugin)));
        let audit = Arc::new(InMemoryAuditSink::new());
        let events = Arc::new(EventBus::new());
        let hooks = Arc::new(HookDispatcher::new(
            Vec::new(),
            audit.clone(),
            Arc::new(NoopCrashGuardNotifier),
        ));
        let queue = SessionQueue::new(pool.clone(), SessionQueueConfig::default());

        let router = IngressRouter::new(
            pool.clone(),
            registry,
            Arc::new(NoopDecoder),
            hooks,
            events,
            audit,
            queue,
        );

        Self {
            pool,
            router,
            plugin_instance_id,
        }
    }
}
