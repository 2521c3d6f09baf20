//! The per-worker claim loop (§4.D "Worker loop", "Ordering guarantees").

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use sqlx::PgPool;
use switchyard_core::{DispatchId, PluginRegistry};
use switchyard_storage::control;
use switchyard_storage::outbox::{self, EffectRow};
use tokio::sync::watch;

use crate::config::EffectOutboxConfig;
use crate::sender::deliver;

/// Effects within the same dispatch must land in insertion order; effects
/// targeting distinct channels may proceed concurrently (§4.D "Ordering
/// guarantees"). Group a claimed batch accordingly, preserving each
/// group's relative order from the claim query (`order by created_at
/// asc`).
fn group_by_ordering_key(rows: Vec<EffectRow>) -> Vec<(DispatchId, String, Vec<EffectRow>)> {
    let mut order: Vec<(DispatchId, String)> = Vec::new();
    let mut groups: HashMap<(DispatchId, String), Vec<EffectRow>> = HashMap::new();
    for row in rows {
        let key = (row.dispatch_id, row.channel.clone());
        if !groups.contains_key(&key) {
            order.push(key.clone());
        }
        groups.entry(key).or_default().push(row);
    }
    order
        .into_iter()
        .map(|key| {
            let rows = groups.remove(&key).unwrap_or_default();
            (key.0, key.1, rows)
        })
        .collect()
}

async fn process_batch(
    pool: &PgPool,
    registry: &Arc<dyn PluginRegistry>,
    config: &EffectOutboxConfig,
    rows: Vec<EffectRow>,
) {
    let send_timeout = StdDuration::from_millis(config.send_timeout_ms);
    let groups = group_by_ordering_key(rows);

    let tasks: Vec<_> = groups
        .into_iter()
        .map(|(_dispatch_id, _channel, group_rows)| {
            let pool = pool.clone();
            let registry = Arc::clone(registry);
            let max_attempts = config.max_attempts;
            tokio::spawn(async move {
                for row in group_rows {
                    let id = row.id;
                    if let Err(err) =
                        deliver(&pool, registry.as_ref(), send_timeout, max_attempts, row).await
                    {
                        tracing::error!(error = %err, effect_id = %id, "effect delivery bookkeeping failed");
                    }
                }
            })
        })
        .collect();

    for task in tasks {
        let _ = task.await;
    }
}

/// The main per-worker claim loop. Runs until `shutdown` reports `true`.
pub async fn run_worker(
    pool: PgPool,
    registry: Arc<dyn PluginRegistry>,
    worker_id: String,
    config: EffectOutboxConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    let idle = StdDuration::from_millis(config.idle_poll_ms);
    loop {
        if *shutdown.borrow() {
            return;
        }

        let control_epoch = match control::read(&pool).await {
            Ok(row) => row.control_epoch,
            Err(err) => {
                tracing::warn!(error = %err, worker_id, "control read failed");
                0
            }
        };
        let claimed = outbox::claim_batch(
            &pool,
            &worker_id,
            config.lease_ms,
            control_epoch,
            config.batch_size,
        )
        .await;

        match claimed {
            Ok(rows) if rows.is_empty() => {
                tokio::select! {
                    () = tokio::time::sleep(idle) => continue,
                    _ = shutdown.changed() => return,
                }
            }
            Ok(rows) => process_batch(&pool, &registry, &config, rows).await,
            Err(err) => {
                tracing::warn!(error = %err, worker_id, "claim batch failed");
                tokio::select! {
                    () = tokio::time::sleep(idle) => continue,
                    _ = shutdown.changed() => return,
                }
            }
        }
    }
}
