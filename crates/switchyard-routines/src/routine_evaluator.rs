//! Owns the three background loops that make up the routine evaluator:
//! the cron/condition/oneshot tick, the `routine_event_queue` drain, and
//! the due-scheduled-item fire.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use sqlx::PgPool;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::RoutineEvaluatorConfig;
use crate::evaluator;
use crate::probe::ConditionProbeRegistry;
use crate::scheduled_worker;

/// Background handle for the routine evaluator's loops.
pub struct RoutineEvaluator {
    shutdown_tx: watch::Sender<bool>,
    tick_loop: JoinHandle<()>,
    event_loop: JoinHandle<()>,
    scheduled_loop: JoinHandle<()>,
}

impl RoutineEvaluator {
    /// Spawn the tick loop, the event-drain loop, and the scheduled-item
    /// fire loop, all sharing `pool`.
    #[must_use]
    pub fn spawn(
        pool: PgPool,
        probes: Arc<dyn ConditionProbeRegistry>,
        config: RoutineEvaluatorConfig,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let tick_loop = tokio::spawn(tick_loop(
            pool.clone(),
            Arc::clone(&probes),
            config,
            shutdown_rx.clone(),
        ));
        let event_loop = tokio::spawn(event_loop(pool.clone(), config, shutdown_rx.clone()));
        let scheduled_loop = tokio::spawn(scheduled_loop(pool, config, shutdown_rx));

        Self {
            shutdown_tx,
            tick_loop,
            event_loop,
            scheduled_loop,
        }
    }

    /// Signal every loop to stop and wait for them to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.tick_loop.await;
        let _ = self.event_loop.await;
        let _ = self.scheduled_loop.await;
    }
}

async fn tick_loop(
    pool: PgPool,
    probes: Arc<dyn ConditionProbeRegistry>,
    config: RoutineEvaluatorConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    let interval = StdDuration::from_millis(config.tick_interval_ms);
    loop {
        if *shutdown.borrow() {
            return;
        }
        if let Err(err) = evaluator::tick(&pool, probes.as_ref(), &config).await {
            tracing::warn!(error = %err, "routine tick failed");
        }
        tokio::select! {
            () = tokio::time::sleep(interval) => {}
            _ = shutdown.changed() => return,
        }
    }
}

async fn event_loop(pool: PgPool, config: RoutineEvaluatorConfig, mut shutdown: watch::Receiver<bool>) {
    let worker_id = "routine-events";
    let idle = StdDuration::from_millis(config.idle_poll_ms);
    loop {
        if *shutdown.borrow() {
            return;
        }
        match crate::event::drain(&pool, worker_id, &config).await {
            Ok(0) => {
                tokio::select! {
                    () = tokio::time::sleep(idle) => {}
                    _ = shutdown.changed() => return,
                }
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(error = %err, "routine event drain failed");
                tokio::select! {
                    () = tokio::time::sleep(idle) => {}
                    _ = shutdown.changed() => return,
                }
            }
        }
    }
}

async fn scheduled_loop(
    pool: PgPool,
    config: RoutineEvaluatorConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    let idle = StdDuration::from_millis(config.idle_poll_ms);
    loop {
        if *shutdown.borrow() {
            return;
        }
        match scheduled_worker::fire_due(&pool, config.batch_size).await {
            Ok(0) => {
                tokio::select! {
                    () = tokio::time::sleep(idle) => {}
                    _ = shutdown.changed() => return,
                }
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(error = %err, "scheduled item fire failed");
                tokio::select! {
                    () = tokio::time::sleep(idle) => {}
                    _ = shutdown.changed() => return,
                }
            }
        }
    }
}
