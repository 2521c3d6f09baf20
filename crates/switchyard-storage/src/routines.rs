//! Routines, routine runs, and the routine event queue (§3, §4.E).

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use switchyard_core::{PluginInstanceId, RoutineId, RoutineRunId, ScheduledItemId, WorkItemId};

use crate::error::{StorageError, StorageResult};

/// `routines.trigger_kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    /// Fires on a cron schedule.
    Cron,
    /// Fires when a matching event arrives.
    Event,
    /// Fires when a probe condition is true on cron tick.
    Condition,
    /// Fires exactly once at a fixed time.
    Oneshot,
}

impl TriggerKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Cron => "cron",
            Self::Event => "event",
            Self::Condition => "condition",
            Self::Oneshot => "oneshot",
        }
    }

    fn from_str(value: &str) -> StorageResult<Self> {
        Ok(match value {
            "cron" => Self::Cron,
            "event" => Self::Event,
            "condition" => Self::Condition,
            "oneshot" => Self::Oneshot,
            other => {
                return Err(StorageError::UnrecognizedEnum {
                    column: "routines.trigger_kind",
                    value: other.to_string(),
                })
            }
        })
    }
}

/// One declarative routine.
#[derive(Debug, Clone)]
pub struct RoutineRow {
    /// Identifier.
    pub id: RoutineId,
    /// Owning agent.
    pub agent_id: String,
    /// Trigger kind.
    pub trigger_kind: TriggerKind,
    /// Cron expression, for `cron`/`condition` routines.
    pub cron_expr: Option<String>,
    /// IANA timezone name for cron evaluation.
    pub timezone: Option<String>,
    /// Predicate rule tree, for `event` routines.
    pub rule_json: Option<serde_json::Value>,
    /// Probe identifier, for `condition` routines.
    pub condition_probe: Option<String>,
    /// Probe configuration.
    pub condition_config: Option<serde_json::Value>,
    /// Target plugin instance for the synthesized run, if any.
    pub target_plugin_instance_id: Option<PluginInstanceId>,
    /// Target session key for the synthesized run.
    pub target_session_key: Option<String>,
    /// Prompt template used to synthesize `input_text` when this routine
    /// fires.
    pub action_prompt: String,
    /// Whether this routine is currently active.
    pub enabled: bool,
    /// Next scheduled evaluation time, for cron/condition routines.
    pub next_run_at: Option<DateTime<Utc>>,
}

fn from_row(row: sqlx::postgres::PgRow) -> StorageResult<RoutineRow> {
    let target_plugin_instance_id: Option<Uuid> = row.try_get("target_plugin_instance_id")?;
    Ok(RoutineRow {
        id: RoutineId::from_uuid(row.try_get("id")?),
        agent_id: row.try_get("agent_id")?,
        trigger_kind: TriggerKind::from_str(&row.try_get::<String, _>("trigger_kind")?)?,
        cron_expr: row.try_get("cron_expr")?,
        timezone: row.try_get("timezone")?,
        rule_json: row.try_get("rule_json")?,
        condition_probe: row.try_get("condition_probe")?,
        condition_config: row.try_get("condition_config")?,
        target_plugin_instance_id: target_plugin_instance_id.map(PluginInstanceId::from_uuid),
        target_session_key: row.try_get("target_session_key")?,
        action_prompt: row.try_get("action_prompt")?,
        enabled: row.try_get("enabled")?,
        next_run_at: row.try_get("next_run_at")?,
    })
}

/// List every routine regardless of `enabled`, for admin listings.
///
/// # Errors
///
/// Returns [`StorageError::Database`] on any driver failure.
pub async fn list_all(pool: &PgPool) -> StorageResult<Vec<RoutineRow>> {
    let rows = sqlx::query(
        r#"
        select id, agent_id, trigger_kind, cron_expr, timezone, rule_json, condition_probe,
               condition_config, target_plugin_instance_id, target_session_key, action_prompt,
               enabled, next_run_at
        from routines order by agent_id, id
        "#,
    )
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(from_row).collect()
}

/// Enable or disable a routine (operator control).
///
/// # Errors
///
/// Returns [`StorageError::Database`] on any driver failure.
pub async fn set_enabled(pool: &PgPool, id: RoutineId, enabled: bool) -> StorageResult<()> {
    sqlx::query("update routines set enabled = $1 where id = $2")
        .bind(enabled)
        .bind(id.as_uuid())
        .execute(pool)
        .await?;
    Ok(())
}

/// List all enabled routines of a given trigger kind, the candidate set
/// for one evaluation pass (§4.E "indexed by `agent_id` and
/// `trigger_kind`").
///
/// # Errors
///
/// Returns [`StorageError::Database`] on any driver failure.
pub async fn list_enabled_by_kind(
    pool: &PgPool,
    trigger_kind: TriggerKind,
) -> StorageResult<Vec<RoutineRow>> {
    let rows = sqlx::query(
        r#"
        select id, agent_id, trigger_kind, cron_expr, timezone, rule_json, condition_probe,
               condition_config, target_plugin_instance_id, target_session_key, action_prompt,
               enabled, next_run_at
        from routines where trigger_kind = $1 and enabled = true
        "#,
    )
    .bind(trigger_kind.as_str())
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(from_row).collect()
}

/// Record a routine evaluation's firing outcome and advance bookkeeping.
///
/// # Errors
///
/// Returns [`StorageError::Database`] on any driver failure.
pub async fn record_fire(
    pool: &PgPool,
    id: RoutineId,
    next_run_at: Option<DateTime<Utc>>,
    last_status: &str,
) -> StorageResult<()> {
    sqlx::query(
        "update routines set last_fired_at = now(), next_run_at = $1, last_status = $2 \
         where id = $3",
    )
    .bind(next_run_at)
    .bind(last_status)
    .bind(id.as_uuid())
    .execute(pool)
    .await?;
    Ok(())
}

/// Routine Run decision (§3 "Routine run").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// A scheduled item or dispatch was written.
    Enqueued,
    /// The rule evaluated false, or the routine is disabled/paused.
    Skipped,
    /// The rule evaluated true but the routine's throttle window blocked
    /// it.
    Throttled,
    /// Evaluation itself failed (e.g. malformed rule).
    Error,
}

impl Decision {
    fn as_str(self) -> &'static str {
        match self {
            Self::Enqueued => "enqueued",
            Self::Skipped => "skipped",
            Self::Throttled => "throttled",
            Self::Error => "error",
        }
    }
}

/// Insert a routine run receipt.
///
/// # Errors
///
/// Returns [`StorageError::Database`] on any driver failure.
pub async fn insert_routine_run(
    pool: &PgPool,
    routine_id: RoutineId,
    decision: Decision,
    decision_reason: &str,
    envelope_json: &serde_json::Value,
    scheduled_item_id: Option<ScheduledItemId>,
    work_item_id: Option<WorkItemId>,
) -> StorageResult<RoutineRunId> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        insert into routine_runs (
            id, routine_id, decision, decision_reason, envelope_json,
            scheduled_item_id, work_item_id
        ) values ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(id)
    .bind(routine_id.as_uuid())
    .bind(decision.as_str())
    .bind(decision_reason)
    .bind(envelope_json)
    .bind(scheduled_item_id.map(|s| s.as_uuid()))
    .bind(work_item_id.map(|w| w.as_uuid()))
    .execute(pool)
    .await?;
    Ok(RoutineRunId::from_uuid(id))
}

/// Most recent fire timestamp for a routine with `decision = 'enqueued'`,
/// for throttle-window checks.
///
/// # Errors
///
/// Returns [`StorageError::Database`] on any driver failure.
pub async fn last_enqueued_fire(
    pool: &PgPool,
    routine_id: RoutineId,
) -> StorageResult<Option<DateTime<Utc>>> {
    let row: Option<(DateTime<Utc>,)> = sqlx::query_as(
        "select created_at from routine_runs where routine_id = $1 and decision = 'enqueued' \
         order by created_at desc limit 1",
    )
    .bind(routine_id.as_uuid())
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|(t,)| t))
}

/// Push an event envelope onto the routine inbox for later evaluation.
///
/// # Errors
///
/// Returns [`StorageError::Database`] on any driver failure.
pub async fn push_event(pool: &PgPool, envelope_json: &serde_json::Value) -> StorageResult<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query("insert into routine_event_queue (id, envelope_json) values ($1, $2)")
        .bind(id)
        .bind(envelope_json)
        .execute(pool)
        .await?;
    Ok(id)
}

/// Claim a batch of queued events for evaluation.
///
/// # Errors
///
/// Returns [`StorageError::Database`] on any driver failure.
pub async fn claim_events(
    pool: &PgPool,
    worker_id: &str,
    lease_ms: i64,
    batch_size: i64,
) -> StorageResult<Vec<(Uuid, serde_json::Value)>> {
    let rows = sqlx::query(
        r#"
        with candidates as (
            select id from routine_event_queue
            where claimed_by is null or lease_expires_at < now()
            order by created_at asc
            limit $3
            for update skip locked
        )
        update routine_event_queue
        set claimed_by = $1, lease_expires_at = now() + make_interval(secs => $2 / 1000.0)
        where id in (select id from candidates)
        returning id, envelope_json
        "#,
    )
    .bind(worker_id)
    .bind(lease_ms)
    .bind(batch_size)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| Ok((row.try_get("id")?, row.try_get("envelope_json")?)))
        .collect::<Result<Vec<_>, sqlx::Error>>()
        .map_err(StorageError::from)
}

/// Remove a fully-evaluated event from the inbox.
///
/// # Errors
///
/// Returns [`StorageError::Database`] on any driver failure.
pub async fn ack_event(pool: &PgPool, id: Uuid) -> StorageResult<()> {
    sqlx::query("delete from routine_event_queue where id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
