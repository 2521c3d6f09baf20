//! Routine admin commands.

use sqlx::PgPool;
use switchyard_core::RoutineId;
use switchyard_storage::routines;

pub(crate) async fn list(pool: &PgPool) -> anyhow::Result<()> {
    let rows = routines::list_all(pool).await?;
    if rows.is_empty() {
        println!("no routines configured");
        return Ok(());
    }
    println!("{:<38} {:<10} {:<8} AGENT", "ID", "TRIGGER", "ENABLED");
    for row in rows {
        println!(
            "{:<38} {:<10} {:<8} {}",
            row.id.to_string(),
            format!("{:?}", row.trigger_kind),
            row.enabled,
            row.agent_id
        );
    }
    Ok(())
}

pub(crate) async fn enable(pool: &PgPool, id: RoutineId) -> anyhow::Result<()> {
    routines::set_enabled(pool, id, true).await?;
    println!("enabled routine {id}");
    Ok(())
}

pub(crate) async fn disable(pool: &PgPool, id: RoutineId) -> anyhow::Result<()> {
    routines::set_enabled(pool, id, false).await?;
    println!("disabled routine {id}");
    Ok(())
}
