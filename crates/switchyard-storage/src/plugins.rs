//! Plugin instances (§3 "Plugin instance").

use sqlx::{PgPool, Row};
use uuid::Uuid;

use switchyard_core::PluginInstanceId;

use crate::error::{StorageError, StorageResult};

/// A configured plugin instance row.
#[derive(Debug, Clone)]
pub struct PluginInstanceRow {
    /// Identifier.
    pub id: PluginInstanceId,
    /// Stable plugin type tag (e.g. `"discord"`).
    pub plugin_type: String,
    /// Human-readable name, for admin UIs.
    pub name: String,
    /// Opaque config, possibly containing encrypted fields.
    pub config: serde_json::Value,
    /// Whether this instance is currently enabled.
    pub enabled: bool,
}

fn from_row(row: sqlx::postgres::PgRow) -> StorageResult<PluginInstanceRow> {
    Ok(PluginInstanceRow {
        id: PluginInstanceId::from_uuid(row.try_get("id")?),
        plugin_type: row.try_get("plugin_type")?,
        name: row.try_get("name")?,
        config: row.try_get("config")?,
        enabled: row.try_get("enabled")?,
    })
}

/// Fetch a plugin instance by ID.
///
/// # Errors
///
/// Returns [`StorageError::NotFound`] if no such row exists.
pub async fn get_plugin_instance(
    pool: &PgPool,
    id: PluginInstanceId,
) -> StorageResult<PluginInstanceRow> {
    let row = sqlx::query(
        "select id, plugin_type, name, config, enabled from plugin_instances where id = $1",
    )
    .bind(id.as_uuid())
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| StorageError::NotFound(format!("plugin_instance {id}")))?;

    from_row(row)
}

/// Insert a new plugin instance.
///
/// # Errors
///
/// Returns [`StorageError::Database`] on any driver failure.
pub async fn insert_plugin_instance(
    pool: &PgPool,
    plugin_type: &str,
    name: &str,
    config: &serde_json::Value,
) -> StorageResult<PluginInstanceId> {
    let id = Uuid::new_v4();
    sqlx::query(
        "insert into plugin_instances (id, plugin_type, name, config) values ($1, $2, $3, $4)",
    )
    .bind(id)
    .bind(plugin_type)
    .bind(name)
    .bind(config)
    .execute(pool)
    .await?;
    Ok(PluginInstanceId::from_uuid(id))
}

/// Set a plugin instance's `enabled` flag (operator re-enable, or Crash
/// Guard auto-disable — §4.G).
///
/// # Errors
///
/// Returns [`StorageError::Database`] on any driver failure.
pub async fn set_enabled(pool: &PgPool, id: PluginInstanceId, enabled: bool) -> StorageResult<()> {
    sqlx::query("update plugin_instances set enabled = $1, updated_at = now() where id = $2")
        .bind(enabled)
        .bind(id.as_uuid())
        .execute(pool)
        .await?;
    Ok(())
}

/// List every plugin instance regardless of `enabled`, for admin listings.
///
/// # Errors
///
/// Returns [`StorageError::Database`] on any driver failure.
pub async fn list_all(pool: &PgPool) -> StorageResult<Vec<PluginInstanceRow>> {
    let rows = sqlx::query(
        "select id, plugin_type, name, config, enabled from plugin_instances order by plugin_type, name",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(from_row).collect()
}

/// List all enabled plugin instances of a given type, for ingress routing.
///
/// # Errors
///
/// Returns [`StorageError::Database`] on any driver failure.
pub async fn list_enabled_by_type(
    pool: &PgPool,
    plugin_type: &str,
) -> StorageResult<Vec<PluginInstanceRow>> {
    let rows = sqlx::query(
        "select id, plugin_type, name, config, enabled from plugin_instances \
         where plugin_type = $1 and enabled = true",
    )
    .bind(plugin_type)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(from_row).collect()
}
