//! Postgres-backed [`AuditSink`], persisting to `plugin_events` (§3/§6
//! "Event-stream fields").

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use switchyard_audit::{AuditError, AuditQuery, AuditRecord, AuditResult, AuditSink};
use switchyard_core::{PluginInstanceId, WorkItemId};

/// Durable [`AuditSink`] writing through a shared connection pool.
#[derive(Debug, Clone)]
pub struct PgAuditSink {
    pool: PgPool,
}

impl PgAuditSink {
    /// Wrap an existing pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn to_store_err(err: sqlx::Error) -> AuditError {
    AuditError::Store(err.to_string())
}

#[async_trait]
impl AuditSink for PgAuditSink {
    async fn record(&self, record: AuditRecord) -> AuditResult<()> {
        sqlx::query(
            r#"
            insert into plugin_events (
                id, plugin_instance_id, plugin_version, kind, status, work_item_id, detail_json
            ) values ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.id)
        .bind(record.plugin_instance_id.map(|id| id.as_uuid()))
        .bind(record.plugin_version)
        .bind(record.kind)
        .bind(record.status)
        .bind(record.work_item_id.map(|id| id.as_uuid()))
        .bind(record.detail_json)
        .execute(&self.pool)
        .await
        .map_err(to_store_err)?;
        Ok(())
    }

    async fn query(&self, filter: &AuditQuery) -> AuditResult<Vec<AuditRecord>> {
        let limit: i64 = if filter.limit > 0 {
            i64::from(filter.limit)
        } else {
            100
        };

        let rows = sqlx::query(
            r#"
            select id, plugin_instance_id, plugin_version, kind, status, work_item_id,
                   detail_json, created_at
            from plugin_events
            where ($1::uuid is null or plugin_instance_id = $1)
              and ($2::text is null or kind = $2)
              and ($3::timestamptz is null or created_at >= $3)
            order by created_at desc
            limit $4
            "#,
        )
        .bind(filter.plugin_instance_id.map(|id| id.as_uuid()))
        .bind(filter.kind.as_deref())
        .bind(filter.since)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(to_store_err)?;

        rows.into_iter()
            .map(|row| {
                let plugin_instance_id: Option<Uuid> =
                    row.try_get("plugin_instance_id").map_err(to_store_err)?;
                let work_item_id: Option<Uuid> =
                    row.try_get("work_item_id").map_err(to_store_err)?;
                Ok(AuditRecord {
                    id: row.try_get("id").map_err(to_store_err)?,
                    plugin_instance_id: plugin_instance_id.map(PluginInstanceId::from_uuid),
                    plugin_version: row.try_get("plugin_version").map_err(to_store_err)?,
                    kind: row.try_get("kind").map_err(to_store_err)?,
                    status: row.try_get("status").map_err(to_store_err)?,
                    work_item_id: work_item_id.map(WorkItemId::from_uuid),
                    detail_json: row.try_get("detail_json").map_err(to_store_err)?,
                    created_at: row.try_get("created_at").map_err(to_store_err)?,
                })
            })
            .collect()
    }
}
