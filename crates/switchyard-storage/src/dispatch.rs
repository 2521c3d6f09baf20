//! Run dispatches — the durable execution ledger (§3 "Run dispatch",
//! §4.C "Run Dispatcher").

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use switchyard_core::{DispatchId, QueueKey, SessionKey, WorkItemId};

use crate::error::{StorageError, StorageResult};

/// `run_dispatches.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStatus {
    /// Waiting to be claimed.
    Queued,
    /// Claimed by a worker, in flight.
    Running,
    /// Paused; lease released, expects external resume.
    Paused,
    /// Finished successfully. Terminal.
    Completed,
    /// Finished with a non-retryable error, or exhausted retries. Terminal.
    Failed,
    /// Lease expired and was never reclaimed within policy. Terminal.
    Abandoned,
    /// Cancelled by control state. Terminal.
    Cancelled,
    /// Folded into another dispatch's active run. Terminal.
    Merged,
}

impl DispatchStatus {
    fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Abandoned => "abandoned",
            Self::Cancelled => "cancelled",
            Self::Merged => "merged",
        }
    }

    fn from_str(value: &str) -> StorageResult<Self> {
        Ok(match value {
            "queued" => Self::Queued,
            "running" => Self::Running,
            "paused" => Self::Paused,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            "abandoned" => Self::Abandoned,
            "cancelled" => Self::Cancelled,
            "merged" => Self::Merged,
            other => {
                return Err(StorageError::UnrecognizedEnum {
                    column: "run_dispatches.status",
                    value: other.to_string(),
                })
            }
        })
    }

    /// Terminal statuses are sticky (§3 invariant (iii), §8 invariant 3).
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Abandoned | Self::Cancelled | Self::Merged
        )
    }
}

/// `run_dispatches.control_state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlState {
    /// No pending control request.
    Normal,
    /// A pause was requested; worker should transition to `paused` at a
    /// safe checkpoint.
    PauseRequested,
    /// Actively paused.
    Paused,
    /// A cancel was requested; worker should transition to `cancelled`.
    CancelRequested,
    /// Cancelled.
    Cancelled,
}

impl ControlState {
    fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::PauseRequested => "pause_requested",
            Self::Paused => "paused",
            Self::CancelRequested => "cancel_requested",
            Self::Cancelled => "cancelled",
        }
    }

    fn from_str(value: &str) -> StorageResult<Self> {
        Ok(match value {
            "normal" => Self::Normal,
            "pause_requested" => Self::PauseRequested,
            "paused" => Self::Paused,
            "cancel_requested" => Self::CancelRequested,
            "cancelled" => Self::Cancelled,
            other => {
                return Err(StorageError::UnrecognizedEnum {
                    column: "run_dispatches.control_state",
                    value: other.to_string(),
                })
            }
        })
    }
}

/// One run dispatch ledger row.
#[derive(Debug, Clone)]
pub struct DispatchRow {
    /// Identifier.
    pub id: DispatchId,
    /// Human-facing run key (for logs/admin UIs).
    pub run_key: String,
    /// Owning queue lane.
    pub queue_key: QueueKey,
    /// Source work item.
    pub work_item_id: WorkItemId,
    /// Agent this run invokes.
    pub agent_id: String,
    /// Session shard key.
    pub session_key: SessionKey,
    /// Lifecycle status.
    pub status: DispatchStatus,
    /// Pause/cancel control state.
    pub control_state: ControlState,
    /// The raw input text for this run.
    pub input_text: String,
    /// Coalesced text actually handed to the agent (may combine several
    /// messages).
    pub coalesced_text: String,
    /// Number of claim attempts so far.
    pub attempt_count: i32,
    /// Worker ID currently holding the lease, if any.
    pub claimed_by: Option<String>,
    /// Lease expiry.
    pub lease_expires_at: Option<DateTime<Utc>>,
    /// Runtime control epoch at claim time.
    pub claimed_epoch: i64,
    /// If this dispatch replays another (follow-up merge candidate).
    pub replay_of_dispatch_id: Option<DispatchId>,
    /// If this dispatch was merged into another.
    pub merged_into_dispatch_id: Option<DispatchId>,
    /// When this row becomes eligible for claim.
    pub scheduled_at: DateTime<Utc>,
}

fn from_row(row: sqlx::postgres::PgRow) -> StorageResult<DispatchRow> {
    let replay_of: Option<Uuid> = row.try_get("replay_of_dispatch_id")?;
    let merged_into: Option<Uuid> = row.try_get("merged_into_dispatch_id")?;
    Ok(DispatchRow {
        id: DispatchId::from_uuid(row.try_get("id")?),
        run_key: row.try_get("run_key")?,
        queue_key: QueueKey::from(row.try_get::<String, _>("queue_key")?),
        work_item_id: WorkItemId::from_uuid(row.try_get("work_item_id")?),
        agent_id: row.try_get("agent_id")?,
        session_key: SessionKey::new(row.try_get::<String, _>("session_key")?),
        status: DispatchStatus::from_str(&row.try_get::<String, _>("status")?)?,
        control_state: ControlState::from_str(&row.try_get::<String, _>("control_state")?)?,
        input_text: row.try_get("input_text")?,
        coalesced_text: row.try_get("coalesced_text")?,
        attempt_count: row.try_get("attempt_count")?,
        claimed_by: row.try_get("claimed_by")?,
        lease_expires_at: row.try_get("lease_expires_at")?,
        claimed_epoch: row.try_get("claimed_epoch")?,
        replay_of_dispatch_id: replay_of.map(DispatchId::from_uuid),
        merged_into_dispatch_id: merged_into.map(DispatchId::from_uuid),
        scheduled_at: row.try_get("scheduled_at")?,
    })
}

/// Insert a new dispatch row in `queued` status.
///
/// # Errors
///
/// Returns [`StorageError::Database`] on any driver failure.
#[allow(clippy::too_many_arguments)]
pub async fn insert_dispatch(
    pool: &PgPool,
    run_key: &str,
    queue_key: &QueueKey,
    work_item_id: WorkItemId,
    agent_id: &str,
    session_key: &SessionKey,
    input_text: &str,
    coalesced_text: &str,
    replay_of_dispatch_id: Option<DispatchId>,
) -> StorageResult<DispatchId> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        insert into run_dispatches (
            id, run_key, queue_key, work_item_id, agent_id, session_key,
            status, control_state, input_text, coalesced_text, replay_of_dispatch_id
        ) values ($1, $2, $3, $4, $5, $6, 'queued', 'normal', $7, $8, $9)
        "#,
    )
    .bind(id)
    .bind(run_key)
    .bind(queue_key.as_str())
    .bind(work_item_id.as_uuid())
    .bind(agent_id)
    .bind(session_key.as_str())
    .bind(input_text)
    .bind(coalesced_text)
    .bind(replay_of_dispatch_id.map(|d| d.as_uuid()))
    .execute(pool)
    .await?;
    Ok(DispatchId::from_uuid(id))
}

/// Atomically claim the oldest eligible `queued` dispatch row, per the
/// §4.C step 2 claim query (`FOR UPDATE SKIP LOCKED`, ordered by
/// `scheduled_at`).
///
/// Two additional conditions keep this query from violating "at most one
/// `running` dispatch per queue_key" (§5, §8 invariant 2): a row is
/// skipped if another row sharing its `queue_key` is already `running`,
/// and a follow-up row (`replay_of_dispatch_id` set) is skipped while its
/// target dispatch is still non-terminal — that target is expected to
/// absorb it via [`merge_into`] at a safe checkpoint rather than have it
/// run concurrently. Once the target reaches a terminal status without
/// having merged it, the follow-up becomes an ordinary claimable row.
///
/// # Errors
///
/// Returns [`StorageError::Database`] on any driver failure.
pub async fn claim_next_dispatch(
    pool: &PgPool,
    worker_id: &str,
    lease_ms: i64,
    control_epoch: i64,
) -> StorageResult<Option<DispatchRow>> {
    let row = sqlx::query(
        r#"
        with candidate as (
            select rd.id from run_dispatches rd
            where rd.status = 'queued'
              and (rd.lease_expires_at is null or rd.lease_expires_at < now())
              and not exists (
                  select 1 from run_dispatches lane_active
                  where lane_active.queue_key = rd.queue_key
                    and lane_active.status = 'running'
              )
              and (
                  rd.replay_of_dispatch_id is null
                  or exists (
                      select 1 from run_dispatches target
                      where target.id = rd.replay_of_dispatch_id
                        and target.status in
                            ('completed', 'failed', 'abandoned', 'cancelled', 'merged')
                  )
              )
            order by rd.scheduled_at asc
            limit 1
            for update skip locked
        )
        update run_dispatches
        set status = 'running',
            claimed_by = $1,
            lease_expires_at = now() + make_interval(secs => $2 / 1000.0),
            claimed_epoch = $3,
            attempt_count = attempt_count + 1,
            started_at = coalesce(started_at, now())
        where id in (select id from candidate)
        returning id, run_key, queue_key, work_item_id, agent_id, session_key, status,
                  control_state, input_text, coalesced_text, attempt_count, claimed_by,
                  lease_expires_at, claimed_epoch, replay_of_dispatch_id,
                  merged_into_dispatch_id, scheduled_at
        "#,
    )
    .bind(worker_id)
    .bind(lease_ms)
    .bind(control_epoch)
    .fetch_optional(pool)
    .await?;

    row.map(from_row).transpose()
}

/// Extend a held lease by `lease_ms`, conditioned on still holding the
/// claim at the recorded epoch — the heartbeat task's write (§4.C step 3).
/// No-ops (returns `false`) once another worker has reclaimed the row or
/// the epoch has advanced out from under it.
///
/// # Errors
///
/// Returns [`StorageError::Database`] on any driver failure.
pub async fn heartbeat(
    pool: &PgPool,
    id: DispatchId,
    worker_id: &str,
    claimed_epoch: i64,
    lease_ms: i64,
) -> StorageResult<bool> {
    let result = sqlx::query(
        "update run_dispatches \
         set lease_expires_at = now() + make_interval(secs => $1 / 1000.0) \
         where id = $2 and claimed_by = $3 and claimed_epoch = $4 and status = 'running'",
    )
    .bind(lease_ms)
    .bind(id.as_uuid())
    .bind(worker_id)
    .bind(claimed_epoch)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Transition a held dispatch to a terminal or re-queued status,
/// conditioned on the caller still holding the claim at the given epoch
/// (epoch fencing — §4.C "Epoch fencing"). No-ops and returns `false` if
/// another worker has since claimed the row.
///
/// # Errors
///
/// Returns [`StorageError::Database`] on any driver failure.
pub async fn complete_claim(
    pool: &PgPool,
    id: DispatchId,
    worker_id: &str,
    claimed_epoch: i64,
    new_status: DispatchStatus,
    scheduled_at: Option<DateTime<Utc>>,
) -> StorageResult<bool> {
    let is_terminal = new_status.is_terminal();
    let result = sqlx::query(
        r#"
        update run_dispatches
        set status = $1,
            finished_at = case when $2 then now() else finished_at end,
            scheduled_at = coalesce($3, scheduled_at),
            claimed_by = case when $1 = 'queued' then null else claimed_by end,
            lease_expires_at = case when $1 = 'queued' then null else lease_expires_at end
        where id = $4 and claimed_by = $5 and claimed_epoch = $6
        "#,
    )
    .bind(new_status.as_str())
    .bind(is_terminal)
    .bind(scheduled_at)
    .bind(id.as_uuid())
    .bind(worker_id)
    .bind(claimed_epoch)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Read a dispatch's current `control_state` and `claimed_epoch`, for the
/// worker loop's periodic check (§4.C step 5).
///
/// # Errors
///
/// Returns [`StorageError::NotFound`] if the row no longer exists.
pub async fn read_control(
    pool: &PgPool,
    id: DispatchId,
) -> StorageResult<(ControlState, i64)> {
    let row = sqlx::query("select control_state, claimed_epoch from run_dispatches where id = $1")
        .bind(id.as_uuid())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| StorageError::NotFound(format!("run_dispatch {id}")))?;

    Ok((
        ControlState::from_str(&row.try_get::<String, _>("control_state")?)?,
        row.try_get("claimed_epoch")?,
    ))
}

/// Request a pause or cancel on a dispatch (admin-initiated control).
///
/// # Errors
///
/// Returns [`StorageError::Database`] on any driver failure.
pub async fn request_control(
    pool: &PgPool,
    id: DispatchId,
    state: ControlState,
) -> StorageResult<()> {
    sqlx::query("update run_dispatches set control_state = $1 where id = $2")
        .bind(state.as_str())
        .bind(id.as_uuid())
        .execute(pool)
        .await?;
    Ok(())
}

/// Merge a follow-up dispatch into the currently active one (§4.C "Merge
/// semantics"): the follow-up row becomes `merged`, and its text is
/// returned so the caller can absorb it into the active run's state.
///
/// # Errors
///
/// Returns [`StorageError::Database`] on any driver failure.
pub async fn merge_into(
    pool: &PgPool,
    follow_up_id: DispatchId,
    active_id: DispatchId,
) -> StorageResult<()> {
    sqlx::query(
        "update run_dispatches set status = 'merged', merged_into_dispatch_id = $1, \
         finished_at = now() where id = $2",
    )
    .bind(active_id.as_uuid())
    .bind(follow_up_id.as_uuid())
    .execute(pool)
    .await?;
    Ok(())
}

/// Fold every `queued` follow-up row filed against `active_id` (Session
/// Queue's `LaneMode::Followup`, §4.B) into the active dispatch's own
/// `coalesced_text`, then mark each one `merged` via [`merge_into`].
///
/// Called from the active run's own control-poll checkpoint
/// ([`crate::dispatch`]'s caller in `switchyard-dispatcher`) while the
/// active dispatch is still `running`, which is what keeps
/// `claim_next_dispatch` from ever handing a follow-up row to another
/// worker in the first place — this function is what actually drains it.
///
/// # Errors
///
/// Returns [`StorageError::Database`] on any driver failure.
pub async fn absorb_replay_followups(pool: &PgPool, active_id: DispatchId) -> StorageResult<()> {
    let follow_ups: Vec<(Uuid, String)> = sqlx::query_as(
        "select id, coalesced_text from run_dispatches \
         where replay_of_dispatch_id = $1 and status = 'queued' \
         order by scheduled_at asc",
    )
    .bind(active_id.as_uuid())
    .fetch_all(pool)
    .await?;

    for (follow_up_uuid, text) in follow_ups {
        let follow_up_id = DispatchId::from_uuid(follow_up_uuid);
        sqlx::query(
            "update run_dispatches set coalesced_text = coalesced_text || E'\n' || $1 \
             where id = $2",
        )
        .bind(&text)
        .bind(active_id.as_uuid())
        .execute(pool)
        .await?;
        merge_into(pool, follow_up_id, active_id).await?;
    }
    Ok(())
}

/// Requeue `running` rows whose lease has expired without a heartbeat
/// (§4.C "Failure model": "A lost heartbeat causes the row to become
/// eligible for re-claim after `lease_expires_at`"). Returns the requeued
/// IDs so the caller can log or notify on them.
///
/// # Errors
///
/// Returns [`StorageError::Database`] on any driver failure.
pub async fn reap_expired_leases(pool: &PgPool) -> StorageResult<Vec<DispatchId>> {
    let rows: Vec<(Uuid,)> = sqlx::query_as(
        r#"
        update run_dispatches
        set status = 'queued',
            claimed_by = null,
            lease_expires_at = null
        where status = 'running' and lease_expires_at < now()
        returning id
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|(id,)| DispatchId::from_uuid(id)).collect())
}

/// Fetch a dispatch row by ID.
///
/// # Errors
///
/// Returns [`StorageError::NotFound`] if no such row exists.
pub async fn get_dispatch(pool: &PgPool, id: DispatchId) -> StorageResult<DispatchRow> {
    let row = sqlx::query(
        r#"
        select id, run_key, queue_key, work_item_id, agent_id, session_key, status,
               control_state, input_text, coalesced_text, attempt_count, claimed_by,
               lease_expires_at, claimed_epoch, replay_of_dispatch_id,
               merged_into_dispatch_id, scheduled_at
        from run_dispatches where id = $1
        "#,
    )
    .bind(id.as_uuid())
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| StorageError::NotFound(format!("run_dispatch {id}")))?;

    from_row(row)
}
