//! `switchyardd` - the long-running process wiring every pipeline
//! component to a shared Postgres pool: Ingress's HTTP surface, the
//! Session Queue, the Run Dispatcher, the Effect Outbox, the Routine
//! Evaluator, the Hook Pipeline, and the Crash Guard.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod agent_runner;

use std::sync::Arc;

use switchyard_core::{PluginRegistry, StaticPluginRegistry};
use switchyard_crypto::NoopDecoder;
use switchyard_dispatcher::RunDispatcher;
use switchyard_events::EventBus;
use switchyard_hooks::HookDispatcher;
use switchyard_outbox::{EffectOutbox, EffectOutboxConfig, NoopReconciler};
use switchyard_routines::{NoopProbeRegistry, RoutineEvaluator, RoutineEvaluatorConfig};
use switchyard_storage::PgAuditSink;

/// Env var naming the HTTP bind address, e.g. `0.0.0.0:8080`.
const ENV_BIND_ADDR: &str = "SWITCHYARD_BIND_ADDR";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Env var naming the base URL of the external agent-inference service.
const ENV_AGENT_RUNNER_URL: &str = "SWITCHYARD_AGENT_RUNNER_URL";
const DEFAULT_AGENT_RUNNER_URL: &str = "http://127.0.0.1:9000";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(err) = switchyard_telemetry::setup_default_logging() {
        eprintln!("failed to initialize logging: {err}");
    }

    let config = switchyard_config::RuntimeConfig::from_env()?;
    tracing::info!(?config, "loaded runtime configuration");

    let pool = switchyard_storage::connect_from_env().await?;
    switchyard_storage::migrate(&pool).await?;

    let audit: Arc<dyn switchyard_audit::AuditSink> = Arc::new(PgAuditSink::new(pool.clone()));
    let events = Arc::new(EventBus::new());
    let decoder: Arc<dyn switchyard_crypto::SecretDecoder> = Arc::new(NoopDecoder);

    // Plugin handlers are loaded by the external plugin loader (out of
    // scope for this crate) and registered here at startup; none are
    // wired in this build, so the pipeline runs with an empty registry.
    let plugins: Arc<dyn PluginRegistry> = Arc::new(StaticPluginRegistry::new());

    let crash_guard = Arc::new(switchyard_crashguard::CrashGuard::new(
        pool.clone(),
        Arc::clone(&audit),
        config.crash_guard_config(),
    ));

    let crash_guard_notifier: Arc<dyn switchyard_hooks::CrashGuardNotifier> =
        Arc::clone(&crash_guard);
    let hooks = Arc::new(
        HookDispatcher::new(Vec::new(), Arc::clone(&audit), crash_guard_notifier)
            .with_budget_ms(config.hook_event_budget_ms),
    );

    let queue = switchyard_queue::SessionQueue::new(pool.clone(), config.session_queue_config());
    queue.recover_on_startup().await?;

    let agent_runner_url = std::env::var(ENV_AGENT_RUNNER_URL)
        .unwrap_or_else(|_| DEFAULT_AGENT_RUNNER_URL.to_string());
    let runner = Arc::new(agent_runner::HttpAgentRunner::new(agent_runner_url));

    let dispatcher = RunDispatcher::spawn(
        pool.clone(),
        queue.clone(),
        runner,
        config.run_dispatcher_config(),
    );

    let outbox = EffectOutbox::spawn(
        pool.clone(),
        Arc::clone(&plugins),
        Arc::new(NoopReconciler),
        EffectOutboxConfig::default(),
    );

    let routines = RoutineEvaluator::spawn(
        pool.clone(),
        Arc::new(NoopProbeRegistry),
        RoutineEvaluatorConfig::default(),
    );

    let ingress = Arc::new(switchyard_ingress::IngressRouter::new(
        pool.clone(),
        plugins,
        decoder,
        hooks,
        events,
        audit,
        queue,
    ));

    let app = switchyard_ingress::http_router(ingress);
    let bind_addr =
        std::env::var(ENV_BIND_ADDR).unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(%bind_addr, "switchyardd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutting down background workers");
    dispatcher.shutdown().await;
    outbox.shutdown().await;
    routines.shutdown().await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
