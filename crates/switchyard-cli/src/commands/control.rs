//! Runtime Control commands (§4.H): pause, resume, emergency stop, and the
//! global concurrency budget.

use sqlx::PgPool;
use switchyard_storage::PauseMode;

pub(crate) async fn status(pool: &PgPool) -> anyhow::Result<()> {
    let row = switchyard_control::read(pool).await?;
    println!("processing_enabled:      {}", row.processing_enabled);
    println!("pause_mode:               {:?}", row.pause_mode);
    println!("control_epoch:            {}", row.control_epoch);
    println!("max_concurrent_dispatches: {}", row.max_concurrent_dispatches);
    if let Some(reason) = &row.pause_reason {
        println!("pause_reason:             {reason}");
    }
    Ok(())
}

pub(crate) async fn pause(pool: &PgPool, hard: bool, reason: Option<String>) -> anyhow::Result<()> {
    let mode = if hard { PauseMode::Hard } else { PauseMode::Soft };
    let epoch = switchyard_control::pause(pool, mode, reason.as_deref()).await?;
    println!("paused (epoch {epoch})");
    Ok(())
}

pub(crate) async fn resume(pool: &PgPool) -> anyhow::Result<()> {
    let epoch = switchyard_control::resume(pool).await?;
    println!("resumed (epoch {epoch})");
    Ok(())
}

pub(crate) async fn emergency_stop(pool: &PgPool, reason: String) -> anyhow::Result<()> {
    let epoch = switchyard_control::emergency_stop(pool, &reason).await?;
    println!("emergency stop triggered (epoch {epoch})");
    Ok(())
}

pub(crate) async fn set_max_concurrent(pool: &PgPool, value: i32) -> anyhow::Result<()> {
    switchyard_control::set_max_concurrent(pool, value).await?;
    println!("max_concurrent_dispatches set to {value}");
    Ok(())
}
