//! Runtime Control (spec.md §4.H): the thin admin-operation surface over
//! the singleton `runtime_control` row. Workers poll this row at least
//! once per lease period to honor pause/cancel/epoch transitions; this
//! crate is the write side operators (CLI, admin API) call into.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;

pub use error::{ControlError, ControlResult};

use sqlx::PgPool;

pub use switchyard_storage::{ControlRow, PauseMode};

/// The allowed range for `max_concurrent_dispatches` (§4.H).
pub const MAX_CONCURRENT_RANGE: std::ops::RangeInclusive<i32> = 1..=100;

/// Read the current runtime control state.
///
/// # Errors
///
/// Returns [`ControlError::Storage`] on any driver failure.
pub async fn read(pool: &PgPool) -> ControlResult<ControlRow> {
    Ok(switchyard_storage::control::read(pool).await?)
}

/// Pause processing. Returns the new control epoch.
///
/// # Errors
///
/// Returns [`ControlError::Storage`] on any driver failure.
pub async fn pause(pool: &PgPool, mode: PauseMode, reason: Option<&str>) -> ControlResult<i64> {
    let epoch = switchyard_storage::control::pause(pool, mode, reason).await?;
    tracing::info!(control_epoch = epoch, ?mode, reason, "processing paused");
    Ok(epoch)
}

/// Resume processing. Returns the new control epoch.
///
/// # Errors
///
/// Returns [`ControlError::Storage`] on any driver failure.
pub async fn resume(pool: &PgPool) -> ControlResult<i64> {
    let epoch = switchyard_storage::control::resume(pool).await?;
    tracing::info!(control_epoch = epoch, "processing resumed");
    Ok(epoch)
}

/// Emergency stop: a hard pause with a mandatory operator reason
/// (§4.H, §5 "Global emergency stop").
///
/// # Errors
///
/// Returns [`ControlError::Storage`] on any driver failure.
pub async fn emergency_stop(pool: &PgPool, reason: &str) -> ControlResult<i64> {
    let epoch = switchyard_storage::control::emergency_stop(pool, reason).await?;
    tracing::warn!(control_epoch = epoch, reason, "emergency stop triggered");
    Ok(epoch)
}

/// Update the global concurrent-dispatch budget.
///
/// # Errors
///
/// Returns [`ControlError::InvalidConcurrency`] if `max_concurrent` is
/// outside `1..=100`, or [`ControlError::Storage`] on any driver
/// failure.
pub async fn set_max_concurrent(pool: &PgPool, max_concurrent: i32) -> ControlResult<()> {
    if !MAX_CONCURRENT_RANGE.contains(&max_concurrent) {
        return Err(ControlError::InvalidConcurrency(max_concurrent));
    }
    switchyard_storage::control::set_max_concurrent(pool, max_concurrent).await?;
    tracing::info!(max_concurrent, "max concurrent dispatches updated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_and_over_100() {
        assert!(!MAX_CONCURRENT_RANGE.contains(&0));
        assert!(!MAX_CONCURRENT_RANGE.contains(&101));
        assert!(MAX_CONCURRENT_RANGE.contains(&1));
        assert!(MAX_CONCURRENT_RANGE.contains(&100));
    }
}
