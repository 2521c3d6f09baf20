//! Cron/condition/oneshot tick evaluation (§4.E "Evaluation",
//! "Condition triggers").

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;

use switchyard_storage::routines::{
    self, Decision, RoutineRow, TriggerKind,
};
use switchyard_storage::scheduled::{self, ScheduledItemType};

use crate::config::RoutineEvaluatorConfig;
use crate::cron::CronSchedule;
use crate::error::RoutineResult;
use crate::probe::ConditionProbeRegistry;

/// One pass over every enabled routine of the three time-driven trigger
/// kinds (`cron`, `condition`, `oneshot`).
pub async fn tick(
    pool: &PgPool,
    probes: &dyn ConditionProbeRegistry,
    config: &RoutineEvaluatorConfig,
) -> RoutineResult<()> {
    for kind in [TriggerKind::Cron, TriggerKind::Condition, TriggerKind::Oneshot] {
        tick_kind(pool, probes, config, kind).await?;
    }
    Ok(())
}

async fn tick_kind(
    pool: &PgPool,
    probes: &dyn ConditionProbeRegistry,
    config: &RoutineEvaluatorConfig,
    kind: TriggerKind,
) -> RoutineResult<()> {
    let now = Utc::now();
    for routine in routines::list_enabled_by_kind(pool, kind).await? {
        match routine.next_run_at {
            None => bootstrap_next_run(pool, &routine, now).await?,
            Some(next_run_at) if next_run_at <= now => {
                evaluate_routine(pool, probes, config, kind, &routine, now).await?;
            }
            Some(_) => {}
        }
    }
    Ok(())
}

/// A routine with no `next_run_at` yet (freshly created, or a oneshot
/// that already fired) gets its first occurrence computed but is not
/// fired on this tick.
async fn bootstrap_next_run(
    pool: &PgPool,
    routine: &RoutineRow,
    now: DateTime<Utc>,
) -> RoutineResult<()> {
    let Some(expr) = &routine.cron_expr else {
        return Ok(());
    };
    match CronSchedule::parse(expr).and_then(|schedule| schedule.next_after(now)) {
        Ok(next_run_at) => {
            routines::record_fire(pool, routine.id, Some(next_run_at), "scheduled").await?;
        }
        Err(err) => {
            tracing::warn!(routine_id = %routine.id, error = %err, "failed to bootstrap cron schedule");
        }
    }
    Ok(())
}

async fn evaluate_routine(
    pool: &PgPool,
    probes: &dyn ConditionProbeRegistry,
    config: &RoutineEvaluatorConfig,
    kind: TriggerKind,
    routine: &RoutineRow,
    now: DateTime<Utc>,
) -> RoutineResult<()> {
    let next_run_at = advance_schedule(routine, now);

    if let Some(last) = routines::last_enqueued_fire(pool, routine.id).await? {
        if now - last < Duration::milliseconds(config.default_throttle_ms) {
            record(pool, routine.id, Decision::Throttled, "throttled", next_run_at).await?;
            return Ok(());
        }
    }

    if kind == TriggerKind::Condition {
        let probe_name = routine.condition_probe.as_deref().unwrap_or_default();
        let Some(probe) = probes.resolve(probe_name) else {
            record(
                pool,
                routine.id,
                Decision::Error,
                &format!("no probe registered for {probe_name:?}"),
                next_run_at,
            )
            .await?;
            return Ok(());
        };
        let probe_config = routine
            .condition_config
            .clone()
            .unwrap_or(serde_json::Value::Null);
        match probe.check(&probe_config).await {
            Ok(true) => {}
            Ok(false) => {
                record(pool, routine.id, Decision::Skipped, "probe false", next_run_at).await?;
                return Ok(());
            }
            Err(err) => {
                record(pool, routine.id, Decision::Error, &err.to_string(), next_run_at).await?;
                return Ok(());
            }
        }
    }

    let payload = serde_json::json!({
        "input_text": routine.action_prompt,
        "plugin_instance_id": routine.target_plugin_instance_id.map(|id| id.to_string()),
    });
    let session_key = routine
        .target_session_key
        .clone()
        .unwrap_or_else(|| routine.agent_id.clone());

    let scheduled_id = scheduled::insert(
        pool,
        &routine.agent_id,
        &session_key,
        ScheduledItemType::Cron,
        &payload,
        now,
        Some(routine.id),
        None,
    )
    .await?;

    routines::insert_routine_run(
        pool,
        routine.id,
        Decision::Enqueued,
        "fired",
        &serde_json::json!({"routine_id": routine.id.to_string()}),
        Some(scheduled_id),
        None,
    )
    .await?;
    routines::record_fire(pool, routine.id, next_run_at, "enqueued").await?;
    Ok(())
}

fn advance_schedule(routine: &RoutineRow, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match (routine.trigger_kind, &routine.cron_expr) {
        (TriggerKind::Oneshot, _) => None,
        (_, Some(expr)) => match CronSchedule::parse(expr).and_then(|s| s.next_after(now)) {
            Ok(next) => Some(next),
            Err(err) => {
                tracing::warn!(routine_id = %routine.id, error = %err, "failed to advance cron schedule");
                None
            }
        },
        (_, None) => None,
    }
}

async fn record(
    pool: &PgPool,
    routine_id: switchyard_core::RoutineId,
    decision: Decision,
    reason: &str,
    next_run_at: Option<DateTime<Utc>>,
) -> RoutineResult<()> {
    routines::insert_routine_run(
        pool,
        routine_id,
        decision,
        reason,
        &serde_json::json!({}),
        None,
        None,
    )
    .await?;
    routines::record_fire(pool, routine_id, next_run_at, reason).await?;
    Ok(())
}

/// A no-op probe registry for deployments with no condition-trigger
/// routines configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProbeRegistry;

impl ConditionProbeRegistry for NoopProbeRegistry {
    fn resolve(&self, _name: &str) -> Option<Arc<dyn crate::probe::ConditionProbe>> {
        None
    }
}
