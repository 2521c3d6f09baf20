//! Event-triggered routine matching: drains `routine_event_queue` and
//! writes Run Dispatches directly for matching `event` routines (§4.E
//! "Evaluation": "for events, write a dispatch directly with
//! synthesized `input_text` from `action_prompt`").

use std::str::FromStr;

use chrono::{Duration, Utc};
use sqlx::PgPool;

use switchyard_core::{Envelope, QueueKey, SessionKey, WorkItemId};
use switchyard_storage::dispatch;
use switchyard_storage::routines::{self, Decision, TriggerKind};

use crate::config::RoutineEvaluatorConfig;
use crate::error::{RoutineError, RoutineResult};
use crate::rule::{self, Rule};

/// Claim a batch of queued events and evaluate every enabled `event`
/// routine against each.
pub async fn drain(
    pool: &PgPool,
    worker_id: &str,
    config: &RoutineEvaluatorConfig,
) -> RoutineResult<usize> {
    let claimed = routines::claim_events(pool, worker_id, config.event_lease_ms, config.batch_size)
        .await?;
    let count = claimed.len();

    if count == 0 {
        return Ok(0);
    }

    let event_routines = routines::list_enabled_by_kind(pool, TriggerKind::Event).await?;

    for (id, envelope_json) in claimed {
        if let Err(err) = evaluate_event(pool, config, &event_routines, &envelope_json).await {
            tracing::warn!(error = %err, "event routine evaluation failed");
        }
        routines::ack_event(pool, id).await?;
    }

    Ok(count)
}

async fn evaluate_event(
    pool: &PgPool,
    config: &RoutineEvaluatorConfig,
    event_routines: &[routines::RoutineRow],
    envelope_json: &serde_json::Value,
) -> RoutineResult<()> {
    let envelope: Envelope = serde_json::from_value(envelope_json.clone())
        .map_err(|e| RoutineError::MalformedRule(format!("envelope: {e}")))?;

    for routine in event_routines {
        let Some(rule_json) = &routine.rule_json else {
            continue;
        };
        let rule: Rule = match serde_json::from_value(rule_json.clone()) {
            Ok(rule) => rule,
            Err(err) => {
                tracing::warn!(routine_id = %routine.id, error = %err, "malformed routine rule");
                continue;
            }
        };

        let matched = match rule::evaluate(&rule, &envelope) {
            Ok(matched) => matched,
            Err(err) => {
                routines::insert_routine_run(
                    pool,
                    routine.id,
                    Decision::Error,
                    &err.to_string(),
                    envelope_json,
                    None,
                    None,
                )
                .await?;
                continue;
            }
        };

        if !matched {
            continue;
        }

        if let Some(last) = routines::last_enqueued_fire(pool, routine.id).await? {
            if Utc::now() - last < Duration::milliseconds(config.default_throttle_ms) {
                routines::insert_routine_run(
                    pool,
                    routine.id,
                    Decision::Throttled,
                    "coalescing window",
                    envelope_json,
                    None,
                    None,
                )
                .await?;
                continue;
            }
        }

        fire_dispatch(pool, routine, &envelope, envelope_json).await?;
    }

    Ok(())
}

async fn fire_dispatch(
    pool: &PgPool,
    routine: &routines::RoutineRow,
    envelope: &Envelope,
    envelope_json: &serde_json::Value,
) -> RoutineResult<()> {
    let Ok(work_item_id) = WorkItemId::from_str(&envelope.event_id) else {
        routines::insert_routine_run(
            pool,
            routine.id,
            Decision::Error,
            "envelope eventId is not a work item id",
            envelope_json,
            None,
            None,
        )
        .await?;
        return Ok(());
    };

    let session_key = routine
        .target_session_key
        .clone()
        .map(SessionKey::new)
        .unwrap_or_else(|| envelope.session_key.clone());
    let queue_key = QueueKey::new(&session_key, &routine.agent_id);
    let run_key = format!("{queue_key}/{}", routine.id);

    let dispatch_id = dispatch::insert_dispatch(
        pool,
        &run_key,
        &queue_key,
        work_item_id,
        &routine.agent_id,
        &session_key,
        &routine.action_prompt,
        &routine.action_prompt,
        None,
    )
    .await?;

    routines::insert_routine_run(
        pool,
        routine.id,
        Decision::Enqueued,
        "event matched",
        envelope_json,
        None,
        Some(work_item_id),
    )
    .await?;
    routines::record_fire(pool, routine.id, None, "enqueued").await?;
    tracing::debug!(routine_id = %routine.id, %dispatch_id, "event routine fired a dispatch");
    Ok(())
}
