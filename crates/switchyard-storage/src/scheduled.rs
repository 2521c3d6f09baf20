//! Scheduled items — future timed invocations (§3 "Scheduled item").

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use switchyard_core::{RoutineId, RoutineRunId, ScheduledItemId};

use crate::error::{StorageError, StorageResult};

/// Kind of scheduled item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledItemType {
    /// A one-shot deferred invocation.
    Deferred,
    /// A recurring heartbeat.
    Heartbeat,
    /// A cron-recurring invocation.
    Cron,
}

impl ScheduledItemType {
    fn as_str(self) -> &'static str {
        match self {
            Self::Deferred => "deferred",
            Self::Heartbeat => "heartbeat",
            Self::Cron => "cron",
        }
    }
}

/// `scheduled_items.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledItemStatus {
    /// Waiting for `run_at`.
    Pending,
    /// Claimed by the scheduler, about to fire.
    Firing,
    /// Fired successfully. Terminal for one-shots.
    Fired,
    /// Cancelled before firing.
    Cancelled,
}

impl ScheduledItemStatus {
    fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Firing => "firing",
            Self::Fired => "fired",
            Self::Cancelled => "cancelled",
        }
    }

    fn from_str(value: &str) -> StorageResult<Self> {
        Ok(match value {
            "pending" => Self::Pending,
            "firing" => Self::Firing,
            "fired" => Self::Fired,
            "cancelled" => Self::Cancelled,
            other => {
                return Err(StorageError::UnrecognizedEnum {
                    column: "scheduled_items.status",
                    value: other.to_string(),
                })
            }
        })
    }
}

/// One scheduled item row.
#[derive(Debug, Clone)]
pub struct ScheduledItemRow {
    /// Identifier.
    pub id: ScheduledItemId,
    /// Agent to invoke.
    pub agent_id: String,
    /// Session shard key.
    pub session_key: String,
    /// Kind.
    pub item_type: ScheduledItemType,
    /// Opaque payload.
    pub payload: serde_json::Value,
    /// When this item becomes due.
    pub run_at: DateTime<Utc>,
    /// Lifecycle status.
    pub status: ScheduledItemStatus,
    /// Originating routine, if any.
    pub routine_id: Option<RoutineId>,
    /// Originating routine run receipt, if any.
    pub routine_run_id: Option<RoutineRunId>,
}

fn item_type_from_str(value: &str) -> StorageResult<ScheduledItemType> {
    Ok(match value {
        "deferred" => ScheduledItemType::Deferred,
        "heartbeat" => ScheduledItemType::Heartbeat,
        "cron" => ScheduledItemType::Cron,
        other => {
            return Err(StorageError::UnrecognizedEnum {
                column: "scheduled_items.item_type",
                value: other.to_string(),
            })
        }
    })
}

fn from_row(row: sqlx::postgres::PgRow) -> StorageResult<ScheduledItemRow> {
    let routine_id: Option<Uuid> = row.try_get("routine_id")?;
    let routine_run_id: Option<Uuid> = row.try_get("routine_run_id")?;
    Ok(ScheduledItemRow {
        id: ScheduledItemId::from_uuid(row.try_get("id")?),
        agent_id: row.try_get("agent_id")?,
        session_key: row.try_get("session_key")?,
        item_type: item_type_from_str(&row.try_get::<String, _>("item_type")?)?,
        payload: row.try_get("payload")?,
        run_at: row.try_get("run_at")?,
        status: ScheduledItemStatus::from_str(&row.try_get::<String, _>("status")?)?,
        routine_id: routine_id.map(RoutineId::from_uuid),
        routine_run_id: routine_run_id.map(RoutineRunId::from_uuid),
    })
}

/// Insert a new scheduled item.
///
/// # Errors
///
/// Returns [`StorageError::Database`] on any driver failure.
#[allow(clippy::too_many_arguments)]
pub async fn insert(
    pool: &PgPool,
    agent_id: &str,
    session_key: &str,
    item_type: ScheduledItemType,
    payload: &serde_json::Value,
    run_at: DateTime<Utc>,
    routine_id: Option<RoutineId>,
    routine_run_id: Option<RoutineRunId>,
) -> StorageResult<ScheduledItemId> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        insert into scheduled_items (
            id, agent_id, session_key, item_type, payload, run_at, status,
            routine_id, routine_run_id
        ) values ($1, $2, $3, $4, $5, $6, 'pending', $7, $8)
        "#,
    )
    .bind(id)
    .bind(agent_id)
    .bind(session_key)
    .bind(item_type.as_str())
    .bind(payload)
    .bind(run_at)
    .bind(routine_id.map(|r| r.as_uuid()))
    .bind(routine_run_id.map(|r| r.as_uuid()))
    .execute(pool)
    .await?;
    Ok(ScheduledItemId::from_uuid(id))
}

/// Claim all items due at or before now, transitioning them to `firing`.
///
/// # Errors
///
/// Returns [`StorageError::Database`] on any driver failure.
pub async fn claim_due(pool: &PgPool, batch_size: i64) -> StorageResult<Vec<ScheduledItemRow>> {
    let rows = sqlx::query(
        r#"
        with candidates as (
            select id from scheduled_items
            where status = 'pending' and run_at <= now()
            order by run_at asc
            limit $1
            for update skip locked
        )
        update scheduled_items set status = 'firing'
        where id in (select id from candidates)
        returning id, agent_id, session_key, item_type, payload, run_at, status,
                  routine_id, routine_run_id
        "#,
    )
    .bind(batch_size)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(from_row).collect()
}

/// Mark a claimed item as fired (one-shots) or reschedule it for its next
/// recurrence (the caller computes `next_run_at` and re-inserts for
/// `cron`/`heartbeat` recurrence rather than mutating this row in place).
///
/// # Errors
///
/// Returns [`StorageError::Database`] on any driver failure.
pub async fn mark_fired(pool: &PgPool, id: ScheduledItemId) -> StorageResult<()> {
    sqlx::query("update scheduled_items set status = 'fired' where id = $1")
        .bind(id.as_uuid())
        .execute(pool)
        .await?;
    Ok(())
}
