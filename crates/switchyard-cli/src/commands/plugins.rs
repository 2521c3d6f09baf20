//! Plugin instance admin commands.

use sqlx::PgPool;
use switchyard_core::PluginInstanceId;
use switchyard_storage::plugins;

pub(crate) async fn list(pool: &PgPool) -> anyhow::Result<()> {
    let rows = plugins::list_all(pool).await?;
    if rows.is_empty() {
        println!("no plugin instances configured");
        return Ok(());
    }
    println!("{:<38} {:<14} {:<8} NAME", "ID", "TYPE", "ENABLED");
    for row in rows {
        println!(
            "{:<38} {:<14} {:<8} {}",
            row.id.to_string(),
            row.plugin_type,
            row.enabled,
            row.name
        );
    }
    Ok(())
}

pub(crate) async fn enable(pool: &PgPool, id: PluginInstanceId) -> anyhow::Result<()> {
    plugins::set_enabled(pool, id, true).await?;
    println!("enabled plugin instance {id}");
    Ok(())
}

pub(crate) async fn disable(pool: &PgPool, id: PluginInstanceId) -> anyhow::Result<()> {
    plugins::set_enabled(pool, id, false).await?;
    println!("disabled plugin instance {id}");
    Ok(())
}
