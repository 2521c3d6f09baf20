//! Converts due [`ScheduledItemRow`]s into Run Dispatches.
//!
//! A scheduled item's `payload` is expected to carry `{"input_text": ...,
//! "plugin_instance_id": ...}` — the shape the cron/condition/oneshot
//! evaluator writes (§4.E) and any other producer (deferred invocations,
//! heartbeats) is expected to follow.

use sqlx::PgPool;
use uuid::Uuid;

use switchyard_core::{PluginInstanceId, SessionKey, WorkItem};
use switchyard_storage::scheduled::{self, ScheduledItemRow};
use switchyard_storage::{dispatch, work_items};

use crate::error::{RoutineError, RoutineResult};

/// Claim and fire a batch of due scheduled items.
pub async fn fire_due(pool: &PgPool, batch_size: i64) -> RoutineResult<usize> {
    let due = scheduled::claim_due(pool, batch_size).await?;
    let count = due.len();
    for item in due {
        if let Err(err) = fire_one(pool, &item).await {
            tracing::warn!(scheduled_item_id = %item.id, error = %err, "failed to fire scheduled item");
        }
    }
    Ok(count)
}

async fn fire_one(pool: &PgPool, item: &ScheduledItemRow) -> RoutineResult<()> {
    let input_text = item
        .payload
        .get("input_text")
        .and_then(serde_json::Value::as_str)
        .map(str::to_owned)
        .unwrap_or_else(|| item.payload.to_string());

    let plugin_instance_id = item
        .payload
        .get("plugin_instance_id")
        .and_then(serde_json::Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
        .map(PluginInstanceId::from_uuid);

    let Some(plugin_instance_id) = plugin_instance_id else {
        return Err(RoutineError::MalformedRule(format!(
            "scheduled item {} has no plugin_instance_id to attribute a work item to",
            item.id
        )));
    };

    let session_key = SessionKey::new(item.session_key.clone());
    let work_item = WorkItem::new(
        plugin_instance_id,
        session_key.clone(),
        "routine",
        "routine fire",
        item.payload.clone(),
    );

    let mut tx = pool.begin().await.map_err(switchyard_storage::StorageError::from)?;
    work_items::insert_work_item(&mut tx, &work_item).await?;
    tx.commit().await.map_err(switchyard_storage::StorageError::from)?;

    let queue_key = switchyard_core::QueueKey::new(&session_key, &item.agent_id);
    let run_key = format!("{queue_key}/{}", item.id);
    dispatch::insert_dispatch(
        pool,
        &run_key,
        &queue_key,
        work_item.id,
        &item.agent_id,
        &session_key,
        &input_text,
        &input_text,
        None,
    )
    .await?;

    scheduled::mark_fired(pool, item.id).await?;
    Ok(())
}
