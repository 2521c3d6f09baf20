//! Effect outbox — at-least-once delivery ledger (§3 "Effect outbox
//! entry", §4.D).

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use switchyard_core::{DispatchId, EffectId, PluginInstanceId};

use crate::error::{StorageError, StorageResult};

/// `effect_outbox.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectStatus {
    /// Waiting to be claimed.
    Pending,
    /// Claimed by a worker, delivery in flight.
    Sending,
    /// Delivered and acknowledged. Terminal.
    Sent,
    /// Delivery failed terminally (non-retryable). Terminal.
    Failed,
    /// Send attempted but acknowledgment was lost; pending reconciliation.
    Unknown,
    /// Swept by a cancelled dispatch. Terminal.
    Cancelled,
}

impl EffectStatus {
    fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sending => "sending",
            Self::Sent => "sent",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
            Self::Cancelled => "cancelled",
        }
    }

    fn from_str(value: &str) -> StorageResult<Self> {
        Ok(match value {
            "pending" => Self::Pending,
            "sending" => Self::Sending,
            "sent" => Self::Sent,
            "failed" => Self::Failed,
            "unknown" => Self::Unknown,
            "cancelled" => Self::Cancelled,
            other => {
                return Err(StorageError::UnrecognizedEnum {
                    column: "effect_outbox.status",
                    value: other.to_string(),
                })
            }
        })
    }
}

/// One effect outbox row.
#[derive(Debug, Clone)]
pub struct EffectRow {
    /// Identifier.
    pub id: EffectId,
    /// Idempotency key, unique across the table.
    pub effect_key: String,
    /// Owning dispatch.
    pub dispatch_id: DispatchId,
    /// Plugin instance to deliver through.
    pub plugin_instance_id: PluginInstanceId,
    /// Delivery channel (e.g. a chat channel ID).
    pub channel: String,
    /// Effect kind (e.g. `"message"`, `"media"`).
    pub kind: String,
    /// Opaque delivery payload.
    pub payload: serde_json::Value,
    /// Lifecycle status.
    pub status: EffectStatus,
    /// Whether a failure on this row should be retried.
    pub retryable: bool,
    /// Number of attempts so far.
    pub attempt_count: i32,
    /// When this row next becomes eligible for claim.
    pub next_attempt_at: DateTime<Utc>,
    /// Provider-assigned reference, once delivered.
    pub provider_ref: Option<String>,
}

fn from_row(row: sqlx::postgres::PgRow) -> StorageResult<EffectRow> {
    Ok(EffectRow {
        id: EffectId::from_uuid(row.try_get("id")?),
        effect_key: row.try_get("effect_key")?,
        dispatch_id: DispatchId::from_uuid(row.try_get("dispatch_id")?),
        plugin_instance_id: PluginInstanceId::from_uuid(row.try_get("plugin_instance_id")?),
        channel: row.try_get("channel")?,
        kind: row.try_get("kind")?,
        payload: row.try_get("payload")?,
        status: EffectStatus::from_str(&row.try_get::<String, _>("status")?)?,
        retryable: row.try_get("retryable")?,
        attempt_count: row.try_get("attempt_count")?,
        next_attempt_at: row.try_get("next_attempt_at")?,
        provider_ref: row.try_get("provider_ref")?,
    })
}

/// Enqueue a new effect, idempotent on `effect_key`: if a row with this
/// key already exists, returns its ID without inserting a duplicate.
///
/// # Errors
///
/// Returns [`StorageError::Database`] on any driver failure.
pub async fn enqueue(
    pool: &PgPool,
    effect_key: &str,
    dispatch_id: DispatchId,
    plugin_instance_id: PluginInstanceId,
    channel: &str,
    kind: &str,
    payload: &serde_json::Value,
) -> StorageResult<EffectId> {
    let existing: Option<(Uuid,)> =
        sqlx::query_as("select id from effect_outbox where effect_key = $1")
            .bind(effect_key)
            .fetch_optional(pool)
            .await?;
    if let Some((id,)) = existing {
        return Ok(EffectId::from_uuid(id));
    }

    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        insert into effect_outbox (
            id, effect_key, dispatch_id, plugin_instance_id, channel, kind, payload, status
        ) values ($1, $2, $3, $4, $5, $6, $7, 'pending')
        on conflict (effect_key) do nothing
        "#,
    )
    .bind(id)
    .bind(effect_key)
    .bind(dispatch_id.as_uuid())
    .bind(plugin_instance_id.as_uuid())
    .bind(channel)
    .bind(kind)
    .bind(payload)
    .execute(pool)
    .await?;
    Ok(EffectId::from_uuid(id))
}

/// Claim a batch of due `pending` rows for exclusive delivery
/// (`FOR UPDATE SKIP LOCKED`, §4.D step 1).
///
/// # Errors
///
/// Returns [`StorageError::Database`] on any driver failure.
pub async fn claim_batch(
    pool: &PgPool,
    worker_id: &str,
    lease_ms: i64,
    control_epoch: i64,
    batch_size: i64,
) -> StorageResult<Vec<EffectRow>> {
    let rows = sqlx::query(
        r#"
        with candidates as (
            select id from effect_outbox
            where status = 'pending' and next_attempt_at <= now()
            order by created_at asc
            limit $4
            for update skip locked
        )
        update effect_outbox
        set status = 'sending',
            claimed_by = $1,
            lease_expires_at = now() + make_interval(secs => $2 / 1000.0),
            claimed_epoch = $3,
            attempt_count = attempt_count + 1
        where id in (select id from candidates)
        returning id, effect_key, dispatch_id, plugin_instance_id, channel, kind, payload,
                  status, retryable, attempt_count, next_attempt_at, provider_ref
        "#,
    )
    .bind(worker_id)
    .bind(lease_ms)
    .bind(control_epoch)
    .bind(batch_size)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(from_row).collect()
}

/// Mark a claimed row delivered and acknowledged.
///
/// # Errors
///
/// Returns [`StorageError::Database`] on any driver failure.
pub async fn mark_sent(pool: &PgPool, id: EffectId, provider_ref: Option<&str>) -> StorageResult<()> {
    sqlx::query(
        "update effect_outbox set status = 'sent', provider_ref = $1, sent_at = now() \
         where id = $2",
    )
    .bind(provider_ref)
    .bind(id.as_uuid())
    .execute(pool)
    .await?;
    Ok(())
}

/// Mark a claimed row for retry after a transient failure.
///
/// # Errors
///
/// Returns [`StorageError::Database`] on any driver failure.
pub async fn mark_retry(
    pool: &PgPool,
    id: EffectId,
    next_attempt_at: DateTime<Utc>,
    last_error: &str,
) -> StorageResult<()> {
    sqlx::query(
        "update effect_outbox set status = 'pending', next_attempt_at = $1, last_error = $2 \
         where id = $3",
    )
    .bind(next_attempt_at)
    .bind(last_error)
    .bind(id.as_uuid())
    .execute(pool)
    .await?;
    Ok(())
}

/// Mark a claimed row as terminally failed.
///
/// # Errors
///
/// Returns [`StorageError::Database`] on any driver failure.
pub async fn mark_failed(pool: &PgPool, id: EffectId, last_error: &str) -> StorageResult<()> {
    sqlx::query("update effect_outbox set status = 'failed', last_error = $1 where id = $2")
        .bind(last_error)
        .bind(id.as_uuid())
        .execute(pool)
        .await?;
    Ok(())
}

/// Mark a claimed row `unknown` after an ambiguous send (§4.D step 3).
///
/// # Errors
///
/// Returns [`StorageError::Database`] on any driver failure.
pub async fn mark_unknown(pool: &PgPool, id: EffectId, unknown_reason: &str) -> StorageResult<()> {
    sqlx::query(
        "update effect_outbox set status = 'unknown', unknown_reason = $1 where id = $2",
    )
    .bind(unknown_reason)
    .bind(id.as_uuid())
    .execute(pool)
    .await?;
    Ok(())
}

/// Reconcile an `unknown` row to `sent` once a matching `provider_ref` is
/// observed (via a reconciliation poll or a later ingress event).
///
/// # Errors
///
/// Returns [`StorageError::Database`] on any driver failure.
pub async fn reconcile_to_sent(
    pool: &PgPool,
    id: EffectId,
    provider_ref: &str,
) -> StorageResult<()> {
    sqlx::query(
        "update effect_outbox set status = 'sent', provider_ref = $1, sent_at = now() \
         where id = $2 and status = 'unknown'",
    )
    .bind(provider_ref)
    .bind(id.as_uuid())
    .execute(pool)
    .await?;
    Ok(())
}

/// List all `unknown` rows, for the reconciliation sweep.
///
/// # Errors
///
/// Returns [`StorageError::Database`] on any driver failure.
pub async fn list_unknown(pool: &PgPool) -> StorageResult<Vec<EffectRow>> {
    let rows = sqlx::query(
        r#"
        select id, effect_key, dispatch_id, plugin_instance_id, channel, kind, payload,
               status, retryable, attempt_count, next_attempt_at, provider_ref
        from effect_outbox where status = 'unknown'
        "#,
    )
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(from_row).collect()
}

/// Sweep all non-terminal effects for a cancelled dispatch to
/// `cancelled`, except `sending` rows — those are left alone and resolve
/// on their own once the in-flight send completes or times out, per the
/// decision recorded for this open question in the project `DESIGN.md`
/// (in-flight sends are allowed to complete since the side effect may
/// already be externally visible).
///
/// # Errors
///
/// Returns [`StorageError::Database`] on any driver failure.
pub async fn cancel_for_dispatch(pool: &PgPool, dispatch_id: DispatchId) -> StorageResult<u64> {
    let result = sqlx::query(
        "update effect_outbox set status = 'cancelled' \
         where dispatch_id = $1 and status = 'pending'",
    )
    .bind(dispatch_id.as_uuid())
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
