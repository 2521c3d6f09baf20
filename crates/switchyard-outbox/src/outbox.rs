//! The Effect Outbox: owns the delivery worker pool and the `unknown`-row
//! reconciliation sweep (§4.D).

use std::sync::Arc;
use std::time::Duration as StdDuration;

use sqlx::PgPool;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use switchyard_core::PluginRegistry;
use switchyard_storage::outbox;

use crate::config::EffectOutboxConfig;
use crate::reconciler::EffectReconciler;
use crate::worker::run_worker;

/// Owns a pool of claim-loop workers plus the `unknown`-row reconciliation
/// sweep.
pub struct EffectOutbox {
    shutdown_tx: watch::Sender<bool>,
    workers: Vec<JoinHandle<()>>,
    reconcile: JoinHandle<()>,
}

impl EffectOutbox {
    /// Spawn `config.worker_count` claim loops plus the reconciliation
    /// sweep, all sharing `pool` and `registry`.
    #[must_use]
    pub fn spawn(
        pool: PgPool,
        registry: Arc<dyn PluginRegistry>,
        reconciler: Arc<dyn EffectReconciler>,
        config: EffectOutboxConfig,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let workers = (0..config.worker_count)
            .map(|index| {
                let worker_id = format!("outbox-{index}");
                tokio::spawn(run_worker(
                    pool.clone(),
                    Arc::clone(&registry),
                    worker_id,
                    config,
                    shutdown_rx.clone(),
                ))
            })
            .collect();

        let reconcile = tokio::spawn(reconcile_loop(
            pool,
            reconciler,
            config.reconcile_interval_secs,
            shutdown_rx,
        ));

        Self {
            shutdown_tx,
            workers,
            reconcile,
        }
    }

    /// Signal every worker and the reconciliation sweep to stop, then wait
    /// for them to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        for worker in self.workers {
            let _ = worker.await;
        }
        let _ = self.reconcile.await;
    }
}

async fn reconcile_loop(
    pool: PgPool,
    reconciler: Arc<dyn EffectReconciler>,
    interval_secs: u64,
    mut shutdown: watch::Receiver<bool>,
) {
    let interval = StdDuration::from_secs(interval_secs);
    loop {
        tokio::select! {
            () = tokio::time::sleep(interval) => {}
            _ = shutdown.changed() => return,
        }
        if *shutdown.borrow() {
            return;
        }

        let unknown = match outbox::list_unknown(&pool).await {
            Ok(rows) => rows,
            Err(err) => {
                tracing::warn!(error = %err, "unknown-row reconciliation list failed");
                continue;
            }
        };

        for row in unknown {
            if let Some(provider_ref) = reconciler.check(&row).await {
                if let Err(err) = outbox::reconcile_to_sent(&pool, row.id, &provider_ref).await {
                    tracing::warn!(error = %err, effect_id = %row.id, "reconcile_to_sent failed");
                }
            }
        }
    }
}
