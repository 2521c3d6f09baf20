//! Work items and idempotency keys (§3, §4.A "Idempotency algorithm").

use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use switchyard_core::{
    Actor, ActorKind, PluginInstanceId, SessionKey, WorkItem, WorkItemId, WorkItemStatus,
};

use crate::error::{StorageError, StorageResult};

fn status_to_str(status: WorkItemStatus) -> &'static str {
    match status {
        WorkItemStatus::New => "new",
        WorkItemStatus::InProgress => "in_progress",
        WorkItemStatus::Completed => "completed",
        WorkItemStatus::Failed => "failed",
        WorkItemStatus::Cancelled => "cancelled",
    }
}

fn status_from_str(value: &str) -> StorageResult<WorkItemStatus> {
    Ok(match value {
        "new" => WorkItemStatus::New,
        "in_progress" => WorkItemStatus::InProgress,
        "completed" => WorkItemStatus::Completed,
        "failed" => WorkItemStatus::Failed,
        "cancelled" => WorkItemStatus::Cancelled,
        other => {
            return Err(StorageError::UnrecognizedEnum {
                column: "work_items.status",
                value: other.to_string(),
            })
        }
    })
}

fn actor_kind_to_str(kind: ActorKind) -> &'static str {
    match kind {
        ActorKind::User => "user",
        ActorKind::Bot => "bot",
        ActorKind::System => "system",
    }
}

fn actor_kind_from_str(value: &str) -> StorageResult<ActorKind> {
    Ok(match value {
        "user" => ActorKind::User,
        "bot" => ActorKind::Bot,
        "system" => ActorKind::System,
        other => {
            return Err(StorageError::UnrecognizedEnum {
                column: "work_items.actor_kind",
                value: other.to_string(),
            })
        }
    })
}

struct WorkItemRow {
    id: Uuid,
    plugin_instance_id: Uuid,
    session_key: String,
    source: String,
    source_ref: Option<String>,
    status: String,
    title: String,
    payload: serde_json::Value,
    actor_kind: Option<String>,
    actor_handle: Option<String>,
    actor_display_name: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl WorkItemRow {
    fn into_work_item(self) -> StorageResult<WorkItem> {
        let actor = match (self.actor_kind, self.actor_handle) {
            (Some(kind), Some(handle)) => Some(Actor {
                kind: actor_kind_from_str(&kind)?,
                handle,
                display_name: self.actor_display_name,
            }),
            _ => None,
        };

        Ok(WorkItem {
            id: WorkItemId::from_uuid(self.id),
            plugin_instance_id: PluginInstanceId::from_uuid(self.plugin_instance_id),
            session_key: SessionKey::new(self.session_key),
            source: self.source,
            source_ref: self.source_ref,
            status: status_from_str(&self.status)?,
            title: self.title,
            payload: self.payload,
            actor,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Insert a new work item row within an open transaction.
///
/// # Errors
///
/// Returns [`StorageError::Database`] on any driver failure.
pub async fn insert_work_item(
    tx: &mut Transaction<'_, Postgres>,
    item: &WorkItem,
) -> StorageResult<()> {
    let (actor_kind, actor_handle, actor_display_name) = match &item.actor {
        Some(actor) => (
            Some(actor_kind_to_str(actor.kind)),
            Some(actor.handle.clone()),
            actor.display_name.clone(),
        ),
        None => (None, None, None),
    };

    sqlx::query(
        r#"
        insert into work_items (
            id, plugin_instance_id, session_key, source, source_ref, status, title,
            payload, actor_kind, actor_handle, actor_display_name, created_at, updated_at
        ) values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        "#,
    )
    .bind(item.id.as_uuid())
    .bind(item.plugin_instance_id.as_uuid())
    .bind(item.session_key.as_str())
    .bind(&item.source)
    .bind(&item.source_ref)
    .bind(status_to_str(item.status))
    .bind(&item.title)
    .bind(&item.payload)
    .bind(actor_kind)
    .bind(actor_handle)
    .bind(actor_display_name)
    .bind(item.created_at)
    .bind(item.updated_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Update a work item's status and `updated_at`.
///
/// # Errors
///
/// Returns [`StorageError::Database`] on any driver failure.
pub async fn update_work_item_status(
    pool: &PgPool,
    id: WorkItemId,
    status: WorkItemStatus,
) -> StorageResult<()> {
    sqlx::query("update work_items set status = $1, updated_at = now() where id = $2")
        .bind(status_to_str(status))
        .bind(id.as_uuid())
        .execute(pool)
        .await?;
    Ok(())
}

/// Fetch a work item by ID.
///
/// # Errors
///
/// Returns [`StorageError::NotFound`] if no such row exists, or
/// [`StorageError::Database`]/[`StorageError::UnrecognizedEnum`] on a
/// malformed row.
pub async fn get_work_item(pool: &PgPool, id: WorkItemId) -> StorageResult<WorkItem> {
    let row = sqlx::query(
        r#"
        select id, plugin_instance_id, session_key, source, source_ref, status, title,
               payload, actor_kind, actor_handle, actor_display_name, created_at, updated_at
        from work_items where id = $1
        "#,
    )
    .bind(id.as_uuid())
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| StorageError::NotFound(format!("work_item {id}")))?;

    let record = WorkItemRow {
        id: row.try_get("id")?,
        plugin_instance_id: row.try_get("plugin_instance_id")?,
        session_key: row.try_get("session_key")?,
        source: row.try_get("source")?,
        source_ref: row.try_get("source_ref")?,
        status: row.try_get("status")?,
        title: row.try_get("title")?,
        payload: row.try_get("payload")?,
        actor_kind: row.try_get("actor_kind")?,
        actor_handle: row.try_get("actor_handle")?,
        actor_display_name: row.try_get("actor_display_name")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    };

    record.into_work_item()
}

/// Insert normalized idempotency key aliases for a work item within an
/// open transaction, ignoring unique-key conflicts (§4.A step 3: "the
/// first row is authoritative").
///
/// # Errors
///
/// Returns [`StorageError::Database`] on any driver failure other than a
/// unique-constraint conflict.
pub async fn insert_idempotency_keys(
    tx: &mut Transaction<'_, Postgres>,
    work_item_id: WorkItemId,
    keys: &[String],
) -> StorageResult<()> {
    for key in keys {
        sqlx::query(
            "insert into idempotency_keys (key, work_item_id) values ($1, $2) \
             on conflict (key) do nothing",
        )
        .bind(key)
        .bind(work_item_id.as_uuid())
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Find the work item, if any, already mapped to one of the given
/// normalized idempotency keys. Returns the matched key alongside the work
/// item ID so the caller can build the `duplicate` ingress event's
/// `matchedKey` detail (§8 scenario S3).
///
/// # Errors
///
/// Returns [`StorageError::Database`] on any driver failure.
pub async fn find_by_idempotency_keys(
    pool: &PgPool,
    keys: &[String],
) -> StorageResult<Option<(String, WorkItemId)>> {
    let row: Option<(String, Uuid)> = sqlx::query_as(
        "select key, work_item_id from idempotency_keys where key = any($1) limit 1",
    )
    .bind(keys)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(key, id)| (key, WorkItemId::from_uuid(id))))
}
