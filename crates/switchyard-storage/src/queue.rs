//! Queue lanes and queue messages (§3, §4.B "Session Queue" durable
//! mirror).

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use switchyard_core::{DispatchId, QueueKey, WorkItemId};

use crate::error::{StorageError, StorageResult};

/// In-memory-state-machine states mirrored to `queue_lanes.state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneState {
    /// No buffered work, no active run.
    Idle,
    /// Debounce window open or a run pending/running with follow-ups.
    Queued,
    /// A run is actively executing for this lane.
    Running,
}

impl LaneState {
    fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Queued => "queued",
            Self::Running => "running",
        }
    }

    fn from_str(value: &str) -> StorageResult<Self> {
        Ok(match value {
            "idle" => Self::Idle,
            "queued" => Self::Queued,
            "running" => Self::Running,
            other => {
                return Err(StorageError::UnrecognizedEnum {
                    column: "queue_lanes.state",
                    value: other.to_string(),
                })
            }
        })
    }
}

/// Session Queue coalescing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneMode {
    /// Buffer follow-ups for the next run (default).
    Collect,
    /// Fold follow-ups into the currently active run at a safe checkpoint.
    Followup,
    /// Reserved for future interactive steering; behaves as `Collect` for
    /// now.
    Steer,
}

impl LaneMode {
    fn as_str(self) -> &'static str {
        match self {
            Self::Collect => "collect",
            Self::Followup => "followup",
            Self::Steer => "steer",
        }
    }

    fn from_str(value: &str) -> StorageResult<Self> {
        Ok(match value {
            "collect" => Self::Collect,
            "followup" => Self::Followup,
            "steer" => Self::Steer,
            other => {
                return Err(StorageError::UnrecognizedEnum {
                    column: "queue_lanes.mode",
                    value: other.to_string(),
                })
            }
        })
    }
}

/// Durable mirror of one Session Queue lane.
#[derive(Debug, Clone)]
pub struct QueueLaneRow {
    /// Shard key: `session_key:agent_id`.
    pub queue_key: QueueKey,
    /// Current lane state.
    pub state: LaneState,
    /// Coalescing mode.
    pub mode: LaneMode,
    /// Whether the lane is administratively paused.
    pub is_paused: bool,
    /// When the current debounce window closes, if debouncing.
    pub debounce_until: Option<DateTime<Utc>>,
    /// Configured debounce window length.
    pub debounce_ms: i64,
    /// Configured pending-queue cap.
    pub max_queued: i32,
    /// The dispatch currently running for this lane, if any.
    pub active_dispatch_id: Option<DispatchId>,
}

fn lane_from_row(row: sqlx::postgres::PgRow) -> StorageResult<QueueLaneRow> {
    let active_dispatch_id: Option<Uuid> = row.try_get("active_dispatch_id")?;
    Ok(QueueLaneRow {
        queue_key: QueueKey::from(row.try_get::<String, _>("queue_key")?),
        state: LaneState::from_str(&row.try_get::<String, _>("state")?)?,
        mode: LaneMode::from_str(&row.try_get::<String, _>("mode")?)?,
        is_paused: row.try_get("is_paused")?,
        debounce_until: row.try_get("debounce_until")?,
        debounce_ms: row.try_get("debounce_ms")?,
        max_queued: row.try_get("max_queued")?,
        active_dispatch_id: active_dispatch_id.map(DispatchId::from_uuid),
    })
}

/// Fetch a lane, creating it with default settings if absent — a lane
/// begins existing implicitly the first time a message arrives for its
/// `queue_key`.
///
/// # Errors
///
/// Returns [`StorageError::Database`] on any driver failure.
pub async fn get_or_create_lane(
    pool: &PgPool,
    queue_key: &QueueKey,
    default_debounce_ms: i64,
    default_max_queued: i32,
) -> StorageResult<QueueLaneRow> {
    sqlx::query(
        "insert into queue_lanes (queue_key, state, mode, debounce_ms, max_queued) \
         values ($1, 'idle', 'collect', $2, $3) \
         on conflict (queue_key) do nothing",
    )
    .bind(queue_key.as_str())
    .bind(default_debounce_ms)
    .bind(default_max_queued)
    .execute(pool)
    .await?;

    let row = sqlx::query(
        "select queue_key, state, mode, is_paused, debounce_until, debounce_ms, max_queued, \
                active_dispatch_id \
         from queue_lanes where queue_key = $1",
    )
    .bind(queue_key.as_str())
    .fetch_one(pool)
    .await?;

    lane_from_row(row)
}

/// Transition a lane into `debouncing`/`queued` with a new debounce
/// deadline.
///
/// # Errors
///
/// Returns [`StorageError::Database`] on any driver failure.
pub async fn arm_debounce(
    pool: &PgPool,
    queue_key: &QueueKey,
    debounce_until: DateTime<Utc>,
) -> StorageResult<()> {
    sqlx::query(
        "update queue_lanes set state = 'queued', debounce_until = $1, updated_at = now() \
         where queue_key = $2",
    )
    .bind(debounce_until)
    .bind(queue_key.as_str())
    .execute(pool)
    .await?;
    Ok(())
}

/// Transition a lane to `running` with the given active dispatch.
///
/// # Errors
///
/// Returns [`StorageError::Database`] on any driver failure.
pub async fn mark_running(
    pool: &PgPool,
    queue_key: &QueueKey,
    dispatch_id: DispatchId,
) -> StorageResult<()> {
    sqlx::query(
        "update queue_lanes set state = 'running', active_dispatch_id = $1, \
         debounce_until = null, updated_at = now() where queue_key = $2",
    )
    .bind(dispatch_id.as_uuid())
    .bind(queue_key.as_str())
    .execute(pool)
    .await?;
    Ok(())
}

/// Transition a lane to `idle`, clearing its active dispatch.
///
/// # Errors
///
/// Returns [`StorageError::Database`] on any driver failure.
pub async fn mark_idle(pool: &PgPool, queue_key: &QueueKey) -> StorageResult<()> {
    sqlx::query(
        "update queue_lanes set state = 'idle', active_dispatch_id = null, updated_at = now() \
         where queue_key = $1",
    )
    .bind(queue_key.as_str())
    .execute(pool)
    .await?;
    Ok(())
}

/// List all lanes whose `state = 'running'` and active dispatch is
/// terminal, or whose `state = 'queued'` debounce window has already
/// closed — the restart recovery sweep targets (§4.B "Durability").
///
/// # Errors
///
/// Returns [`StorageError::Database`] on any driver failure.
pub async fn list_lanes_for_recovery(pool: &PgPool) -> StorageResult<Vec<QueueLaneRow>> {
    let rows = sqlx::query(
        "select ql.queue_key, ql.state, ql.mode, ql.is_paused, ql.debounce_until, \
                ql.debounce_ms, ql.max_queued, ql.active_dispatch_id \
         from queue_lanes ql \
         left join run_dispatches rd on rd.id = ql.active_dispatch_id \
         where (ql.state = 'running' \
                and (rd.id is null or rd.status in \
                     ('completed', 'failed', 'abandoned', 'cancelled', 'merged'))) \
            or (ql.state = 'queued' and ql.debounce_until is not null \
                and ql.debounce_until < now())",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(lane_from_row).collect()
}

/// Pending queue message status, mirroring the §3 closed vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStatus {
    /// Buffered, not yet part of any dispatch.
    Pending,
    /// Folded into a dispatch's coalesced text.
    Included,
    /// Dropped (e.g. pending queue was full).
    Dropped,
    /// Cancelled before inclusion.
    Cancelled,
}

impl MessageStatus {
    fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Included => "included",
            Self::Dropped => "dropped",
            Self::Cancelled => "cancelled",
        }
    }
}

/// One buffered/pending queue message.
#[derive(Debug, Clone)]
pub struct QueueMessageRow {
    /// Identifier.
    pub id: Uuid,
    /// Owning lane.
    pub queue_key: QueueKey,
    /// Source work item.
    pub work_item_id: WorkItemId,
    /// Raw message text.
    pub text: String,
    /// Display name of the sender, for coalesced headers.
    pub sender_name: Option<String>,
    /// When the message arrived.
    pub arrived_at: DateTime<Utc>,
}

/// Insert a pending message into a lane's buffer.
///
/// # Errors
///
/// Returns [`StorageError::Database`] on any driver failure.
pub async fn insert_message(
    pool: &PgPool,
    queue_key: &QueueKey,
    work_item_id: WorkItemId,
    text: &str,
    sender_name: Option<&str>,
) -> StorageResult<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        "insert into queue_messages (id, queue_key, work_item_id, text, sender_name, status) \
         values ($1, $2, $3, $4, $5, 'pending')",
    )
    .bind(id)
    .bind(queue_key.as_str())
    .bind(work_item_id.as_uuid())
    .bind(text)
    .bind(sender_name)
    .execute(pool)
    .await?;
    Ok(id)
}

/// Fetch all `pending` messages for a lane in arrival order, for
/// coalescing into a dispatch's `coalesced_text`.
///
/// # Errors
///
/// Returns [`StorageError::Database`] on any driver failure.
pub async fn take_pending_messages(
    pool: &PgPool,
    queue_key: &QueueKey,
) -> StorageResult<Vec<QueueMessageRow>> {
    let rows = sqlx::query(
        "select id, queue_key, work_item_id, text, sender_name, arrived_at \
         from queue_messages where queue_key = $1 and status = 'pending' \
         order by arrived_at asc",
    )
    .bind(queue_key.as_str())
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            Ok(QueueMessageRow {
                id: row.try_get("id")?,
                queue_key: QueueKey::from(row.try_get::<String, _>("queue_key")?),
                work_item_id: WorkItemId::from_uuid(row.try_get("work_item_id")?),
                text: row.try_get("text")?,
                sender_name: row.try_get("sender_name")?,
                arrived_at: row.try_get("arrived_at")?,
            })
        })
        .collect::<Result<Vec<_>, sqlx::Error>>()
        .map_err(StorageError::from)
}

/// Mark a batch of messages as `included` under the given dispatch.
///
/// # Errors
///
/// Returns [`StorageError::Database`] on any driver failure.
pub async fn mark_messages_included(
    pool: &PgPool,
    message_ids: &[Uuid],
    dispatch_id: DispatchId,
) -> StorageResult<()> {
    sqlx::query(
        "update queue_messages set status = 'included', dispatch_id = $1 where id = any($2)",
    )
    .bind(dispatch_id.as_uuid())
    .bind(message_ids)
    .execute(pool)
    .await?;
    Ok(())
}

/// Mark a single message with a terminal non-`included` status (dropped
/// for being over `max_queued`, or cancelled).
///
/// # Errors
///
/// Returns [`StorageError::Database`] on any driver failure.
pub async fn mark_message_status(
    pool: &PgPool,
    message_id: Uuid,
    status: MessageStatus,
) -> StorageResult<()> {
    sqlx::query("update queue_messages set status = $1 where id = $2")
        .bind(status.as_str())
        .bind(message_id)
        .execute(pool)
        .await?;
    Ok(())
}
