//! The Run Dispatcher: owns the worker pool and the expired-lease reaper
//! (§4.C).

use std::sync::Arc;
use std::time::Duration as StdDuration;

use sqlx::PgPool;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use switchyard_queue::SessionQueue;

use crate::config::RunDispatcherConfig;
use crate::runner::AgentRunner;
use crate::worker::run_worker;

/// Interval between sweeps for `running` rows whose lease expired without a
/// heartbeat (§4.C "Failure model").
const REAP_INTERVAL_SECS: u64 = 30;

/// Owns a pool of claim-loop workers plus the background lease reaper, and
/// provides a single handle to shut both down gracefully.
pub struct RunDispatcher {
    shutdown_tx: watch::Sender<bool>,
    workers: Vec<JoinHandle<()>>,
    reaper: JoinHandle<()>,
}

impl RunDispatcher {
    /// Spawn `config.worker_count` claim loops plus the lease reaper, all
    /// sharing `pool`, `queue`, and `runner`.
    #[must_use]
    pub fn spawn(
        pool: PgPool,
        queue: SessionQueue,
        runner: Arc<dyn AgentRunner>,
        config: RunDispatcherConfig,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let workers = (0..config.worker_count)
            .map(|index| {
                let worker_id = format!("dispatcher-{index}");
                tokio::spawn(run_worker(
                    pool.clone(),
                    queue.clone(),
                    Arc::clone(&runner),
                    worker_id,
                    config,
                    shutdown_rx.clone(),
                ))
            })
            .collect();

        let reaper = tokio::spawn(reap_loop(pool, shutdown_rx));

        Self {
            shutdown_tx,
            workers,
            reaper,
        }
    }

    /// Signal every worker and the reaper to stop, then wait for them to
    /// exit their current loop iteration.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        for worker in self.workers {
            let _ = worker.await;
        }
        let _ = self.reaper.await;
    }
}

async fn reap_loop(pool: PgPool, mut shutdown: watch::Receiver<bool>) {
    let interval = StdDuration::from_secs(REAP_INTERVAL_SECS);
    loop {
        tokio::select! {
            () = tokio::time::sleep(interval) => {}
            _ = shutdown.changed() => return,
        }
        if *shutdown.borrow() {
            return;
        }
        match switchyard_storage::dispatch::reap_expired_leases(&pool).await {
            Ok(reaped) if !reaped.is_empty() => {
                tracing::warn!(count = reaped.len(), "reclaimed abandoned dispatch leases");
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(error = %err, "lease reap sweep failed");
            }
        }
    }
}
