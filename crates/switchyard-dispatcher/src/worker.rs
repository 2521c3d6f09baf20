//! The per-worker claim loop (§4.C "Worker loop").

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::watch;

use switchyard_core::backoff::backoff_delay;
use switchyard_core::DispatchId;
use switchyard_queue::SessionQueue;
use switchyard_storage::dispatch::{self, ControlState, DispatchRow, DispatchStatus};
use switchyard_storage::{control, outbox};

use crate::config::RunDispatcherConfig;
use crate::error::DispatcherResult;
use crate::runner::{AgentRunner, RunError, RunRequest};

/// Why an in-flight run was interrupted by the control-state poll
/// (§4.C step 5).
enum ControlInterrupt {
    /// The control epoch advanced past the one this dispatch was claimed
    /// under; another process (pause/resume/emergency-stop) has fenced us
    /// out.
    EpochAdvanced,
    /// An operator requested a pause on this specific dispatch.
    PauseRequested,
    /// An operator requested cancellation of this specific dispatch.
    CancelRequested,
}

/// Poll runtime control and this dispatch's own control state every
/// `interval` until something worth interrupting the run for shows up.
/// Never returns `Ok` on its own — it's meant to be raced against the
/// runner future in a `tokio::select!` and dropped once that future wins.
///
/// Epoch fencing compares against the *live* `runtime_control.control_epoch`
/// singleton (§4.C "Epoch fencing"), not the dispatch row's own
/// `claimed_epoch` column — that column is only ever rewritten by a future
/// `claim_next_dispatch` call on this same row, so comparing it to itself
/// could never observe a global pause/emergency-stop. Each tick also gives
/// the active run a safe checkpoint to absorb any follow-up dispatch that
/// the Session Queue filed against it (§4.C "Merge semantics").
async fn watch_control(
    pool: &PgPool,
    id: DispatchId,
    claimed_epoch: i64,
    interval: StdDuration,
) -> ControlInterrupt {
    loop {
        tokio::time::sleep(interval).await;

        match control::read(pool).await {
            Ok(control_row) if control_row.control_epoch != claimed_epoch => {
                return ControlInterrupt::EpochAdvanced;
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(error = %err, dispatch_id = %id, "runtime control read failed");
            }
        }

        match dispatch::read_control(pool, id).await {
            Ok((state, _)) => match state {
                ControlState::PauseRequested => return ControlInterrupt::PauseRequested,
                ControlState::CancelRequested => return ControlInterrupt::CancelRequested,
                ControlState::Normal | ControlState::Paused | ControlState::Cancelled => {}
            },
            Err(err) => {
                tracing::warn!(error = %err, dispatch_id = %id, "control-state poll failed");
            }
        }

        if let Err(err) = dispatch::absorb_replay_followups(pool, id).await {
            tracing::warn!(error = %err, dispatch_id = %id, "replay-merge checkpoint failed");
        }
    }
}

/// Renew a held lease at a third of its duration until `stop` fires, per
/// §4.C step 3 ("renews the lease at roughly a third of its duration").
async fn heartbeat_loop(
    pool: PgPool,
    id: DispatchId,
    worker_id: String,
    claimed_epoch: i64,
    lease_ms: i64,
    mut stop: watch::Receiver<bool>,
) {
    let interval = StdDuration::from_millis(u64::try_from((lease_ms / 3).max(1)).unwrap_or(1));
    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = stop.changed() => return,
        }
        match dispatch::heartbeat(&pool, id, &worker_id, claimed_epoch, lease_ms).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(dispatch_id = %id, "heartbeat no-op; lease no longer held");
                return;
            }
            Err(err) => {
                tracing::warn!(error = %err, dispatch_id = %id, "heartbeat write failed");
            }
        }
    }
}

fn build_request(row: &DispatchRow) -> RunRequest {
    RunRequest {
        dispatch_id: row.id,
        queue_key: row.queue_key.clone(),
        work_item_id: row.work_item_id,
        agent_id: row.agent_id.clone(),
        session_key: row.session_key.clone(),
        coalesced_text: row.coalesced_text.clone(),
    }
}

/// Execute one claimed dispatch to completion: heartbeat, race the runner
/// against control, and resolve to a terminal or requeued state.
async fn execute_claim(
    pool: &PgPool,
    queue: &SessionQueue,
    runner: &dyn AgentRunner,
    worker_id: &str,
    config: &RunDispatcherConfig,
    row: DispatchRow,
) -> DispatcherResult<()> {
    let (stop_tx, stop_rx) = watch::channel(false);
    let heartbeat = tokio::spawn(heartbeat_loop(
        pool.clone(),
        row.id,
        worker_id.to_string(),
        row.claimed_epoch,
        config.lease_ms,
        stop_rx,
    ));

    let request = build_request(&row);
    let control_interval = StdDuration::from_millis(config.control_poll_ms);
    let outcome = tokio::select! {
        result = runner.run(&request) => Resolution::Ran(result),
        interrupt = watch_control(pool, row.id, row.claimed_epoch, control_interval) => {
            Resolution::Interrupted(interrupt)
        }
    };

    let _ = stop_tx.send(true);
    heartbeat.abort();

    match outcome {
        Resolution::Ran(Ok(run_outcome)) => {
            for effect in run_outcome.effects {
                outbox::enqueue(
                    pool,
                    &effect.effect_key,
                    row.id,
                    effect.plugin_instance_id,
                    &effect.channel,
                    &effect.kind,
                    &effect.payload,
                )
                .await?;
            }
            dispatch::complete_claim(
                pool,
                row.id,
                worker_id,
                row.claimed_epoch,
                DispatchStatus::Completed,
                None,
            )
            .await?;
            queue.on_run_complete(&row.queue_key).await?;
        }
        Resolution::Ran(Err(run_error)) => {
            handle_run_error(pool, queue, worker_id, config, &row, run_error).await?;
        }
        Resolution::Interrupted(ControlInterrupt::EpochAdvanced) => {
            tracing::info!(dispatch_id = %row.id, "epoch advanced mid-run; yielding claim");
        }
        Resolution::Interrupted(ControlInterrupt::PauseRequested) => {
            dispatch::complete_claim(
                pool,
                row.id,
                worker_id,
                row.claimed_epoch,
                DispatchStatus::Paused,
                None,
            )
            .await?;
        }
        Resolution::Interrupted(ControlInterrupt::CancelRequested) => {
            dispatch::complete_claim(
                pool,
                row.id,
                worker_id,
                row.claimed_epoch,
                DispatchStatus::Cancelled,
                None,
            )
            .await?;
            outbox::cancel_for_dispatch(pool, row.id).await?;
            queue.on_run_complete(&row.queue_key).await?;
        }
    }

    Ok(())
}

enum Resolution {
    Ran(Result<crate::runner::RunOutcome, RunError>),
    Interrupted(ControlInterrupt),
}

async fn handle_run_error(
    pool: &PgPool,
    queue: &SessionQueue,
    worker_id: &str,
    config: &RunDispatcherConfig,
    row: &DispatchRow,
    run_error: RunError,
) -> DispatcherResult<()> {
    let can_retry =
        run_error.retryable && u32::try_from(row.attempt_count).unwrap_or(u32::MAX) < config.max_attempts;
    if can_retry {
        let delay = backoff_delay(u32::try_from(row.attempt_count).unwrap_or(u32::MAX));
        let scheduled_at = Utc::now()
            + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::seconds(60));
        dispatch::complete_claim(
            pool,
            row.id,
            worker_id,
            row.claimed_epoch,
            DispatchStatus::Queued,
            Some(scheduled_at),
        )
        .await?;
        tracing::warn!(
            dispatch_id = %row.id,
            attempt = row.attempt_count,
            error = %run_error.message,
            "run failed, requeued with backoff"
        );
    } else {
        dispatch::complete_claim(
            pool,
            row.id,
            worker_id,
            row.claimed_epoch,
            DispatchStatus::Failed,
            None,
        )
        .await?;
        tracing::error!(
            dispatch_id = %row.id,
            attempt = row.attempt_count,
            error = %run_error.message,
            "run failed terminally"
        );
        queue.on_run_complete(&row.queue_key).await?;
    }
    Ok(())
}

/// The main per-worker claim loop. Runs until `shutdown` reports `true`.
pub async fn run_worker(
    pool: PgPool,
    queue: SessionQueue,
    runner: Arc<dyn AgentRunner>,
    worker_id: String,
    config: RunDispatcherConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    let idle = StdDuration::from_millis(config.idle_poll_ms);
    loop {
        if *shutdown.borrow() {
            return;
        }

        let control_row = match control::read(&pool).await {
            Ok(row) => row,
            Err(err) => {
                tracing::warn!(error = %err, worker_id, "control read failed");
                tokio::select! {
                    () = tokio::time::sleep(idle) => continue,
                    _ = shutdown.changed() => return,
                }
            }
        };

        if !control_row.processing_enabled {
            tokio::select! {
                () = tokio::time::sleep(idle) => continue,
                _ = shutdown.changed() => return,
            }
        }

        let claimed = dispatch::claim_next_dispatch(
            &pool,
            &worker_id,
            config.lease_ms,
            control_row.control_epoch,
        )
        .await;

        let row = match claimed {
            Ok(Some(row)) => row,
            Ok(None) => {
                tokio::select! {
                    () = tokio::time::sleep(idle) => continue,
                    _ = shutdown.changed() => return,
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, worker_id, "claim attempt failed");
                tokio::select! {
                    () = tokio::time::sleep(idle) => continue,
                    _ = shutdown.changed() => return,
                }
            }
        };

        if let Err(err) =
            execute_claim(&pool, &queue, runner.as_ref(), &worker_id, &config, row).await
        {
            tracing::error!(error = %err, worker_id, "claim execution failed");
        }
    }
}
