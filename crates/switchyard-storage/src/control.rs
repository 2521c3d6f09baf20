//! Runtime control — the singleton admin state row (§3 "Runtime
//! control", §4.H "Runtime Control").

use sqlx::{PgPool, Row};

use crate::error::StorageResult;

/// `runtime_control.pause_mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseMode {
    /// In-flight dispatches finish; new claims stop.
    Soft,
    /// In-flight dispatches are asked to checkpoint and pause immediately.
    Hard,
}

impl PauseMode {
    fn as_str(self) -> &'static str {
        match self {
            Self::Soft => "soft",
            Self::Hard => "hard",
        }
    }

    fn from_str(value: &str) -> Self {
        match value {
            "hard" => Self::Hard,
            _ => Self::Soft,
        }
    }
}

/// The singleton runtime control row.
#[derive(Debug, Clone)]
pub struct ControlRow {
    /// Whether new work is currently accepted.
    pub processing_enabled: bool,
    /// How a pause is honored by in-flight dispatches.
    pub pause_mode: PauseMode,
    /// Fencing epoch, incremented on every pause/resume/emergency-stop
    /// transition (§5 "Epoch fencing").
    pub control_epoch: i64,
    /// Global concurrent-dispatch budget (§5 "Resource Model").
    pub max_concurrent_dispatches: i32,
    /// Operator-supplied reason for the current pause, if any.
    pub pause_reason: Option<String>,
}

fn from_row(row: sqlx::postgres::PgRow) -> StorageResult<ControlRow> {
    Ok(ControlRow {
        processing_enabled: row.try_get("processing_enabled")?,
        pause_mode: PauseMode::from_str(&row.try_get::<String, _>("pause_mode")?),
        control_epoch: row.try_get("control_epoch")?,
        max_concurrent_dispatches: row.try_get("max_concurrent_dispatches")?,
        pause_reason: row.try_get("pause_reason")?,
    })
}

/// Read the current runtime control state.
///
/// # Errors
///
/// Returns [`crate::error::StorageError::Database`] on any driver
/// failure.
pub async fn read(pool: &PgPool) -> StorageResult<ControlRow> {
    let row = sqlx::query(
        "select processing_enabled, pause_mode, control_epoch, max_concurrent_dispatches, \
         pause_reason from runtime_control where id = true",
    )
    .fetch_one(pool)
    .await?;
    from_row(row)
}

/// Pause processing, advancing the control epoch so any dispatch claimed
/// under a stale epoch is fenced out (§4.H "pause").
///
/// # Errors
///
/// Returns [`crate::error::StorageError::Database`] on any driver
/// failure.
pub async fn pause(pool: &PgPool, mode: PauseMode, reason: Option<&str>) -> StorageResult<i64> {
    let row = sqlx::query(
        "update runtime_control set processing_enabled = false, pause_mode = $1, \
         pause_reason = $2, control_epoch = control_epoch + 1, updated_at = now() \
         where id = true returning control_epoch",
    )
    .bind(mode.as_str())
    .bind(reason)
    .fetch_one(pool)
    .await?;
    Ok(row.try_get("control_epoch")?)
}

/// Resume processing, advancing the control epoch (§4.H "resume").
///
/// # Errors
///
/// Returns [`crate::error::StorageError::Database`] on any driver
/// failure.
pub async fn resume(pool: &PgPool) -> StorageResult<i64> {
    let row = sqlx::query(
        "update runtime_control set processing_enabled = true, pause_reason = null, \
         control_epoch = control_epoch + 1, updated_at = now() where id = true \
         returning control_epoch",
    )
    .fetch_one(pool)
    .await?;
    Ok(row.try_get("control_epoch")?)
}

/// Emergency stop: equivalent to a hard pause plus an explicit operator
/// reason, reserved for the admin surface's panic button (§6 "Admin
/// surface").
///
/// # Errors
///
/// Returns [`crate::error::StorageError::Database`] on any driver
/// failure.
pub async fn emergency_stop(pool: &PgPool, reason: &str) -> StorageResult<i64> {
    pause(pool, PauseMode::Hard, Some(reason)).await
}

/// Update the global concurrent-dispatch budget.
///
/// # Errors
///
/// Returns [`crate::error::StorageError::Database`] on any driver
/// failure.
pub async fn set_max_concurrent(pool: &PgPool, max_concurrent: i32) -> StorageResult<()> {
    sqlx::query(
        "update runtime_control set max_concurrent_dispatches = $1, updated_at = now() \
         where id = true",
    )
    .bind(max_concurrent)
    .execute(pool)
    .await?;
    Ok(())
}
