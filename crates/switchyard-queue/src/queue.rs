//! The Session Queue itself: a per-lane debounce/coalesce state machine in
//! front of the Run Dispatcher's ledger (§4.B).

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use dashmap::DashMap;
use sqlx::PgPool;
use tokio::sync::Mutex;
use uuid::Uuid;

use switchyard_core::{DispatchId, QueueKey, SessionKey, WorkItemId};
use switchyard_storage::queue::{
    arm_debounce, get_or_create_lane, insert_message, list_lanes_for_recovery, mark_idle,
    mark_messages_included, mark_message_status, mark_running, take_pending_messages,
};
use switchyard_storage::{dispatch, LaneMode, LaneState, MessageStatus};

use crate::coalesce::coalesce;
use crate::config::SessionQueueConfig;
use crate::error::SessionQueueResult;
use crate::lane::{LaneInner, SubState};
use crate::observer::{NoopQueueObserver, QueueObserver};
use crate::receipt::{DropReason, EnqueueOutcome};

/// One incoming message to admit into a lane.
#[derive(Debug, Clone)]
pub struct EnqueueRequest {
    /// The lane this message belongs to.
    pub queue_key: QueueKey,
    /// The session this lane serializes.
    pub session_key: SessionKey,
    /// The agent this lane will dispatch to.
    pub agent_id: String,
    /// The work item that produced this message.
    pub work_item_id: WorkItemId,
    /// Raw message text.
    pub text: String,
    /// Display name of the sender.
    pub sender_name: Option<String>,
}

struct Inner {
    pool: PgPool,
    config: SessionQueueConfig,
    observer: Arc<dyn QueueObserver>,
    lanes: DashMap<QueueKey, Arc<Mutex<LaneInner>>>,
}

/// Per-session debounce/coalesce queue. Cheap to clone — every clone shares
/// the same lane map and pool.
#[derive(Clone)]
pub struct SessionQueue(Arc<Inner>);

impl SessionQueue {
    /// Build a queue over `pool`, using `config`'s defaults for any lane
    /// created for the first time.
    #[must_use]
    pub fn new(pool: PgPool, config: SessionQueueConfig) -> Self {
        Self::with_observer(pool, config, Arc::new(NoopQueueObserver))
    }

    /// Build a queue with an explicit [`QueueObserver`] for typing-indicator
    /// style signals.
    #[must_use]
    pub fn with_observer(
        pool: PgPool,
        config: SessionQueueConfig,
        observer: Arc<dyn QueueObserver>,
    ) -> Self {
        Self(Arc::new(Inner {
            pool,
            config,
            observer,
            lanes: DashMap::new(),
        }))
    }

    async fn lane_handle(&self, queue_key: &QueueKey) -> SessionQueueResult<Arc<Mutex<LaneInner>>> {
        if let Some(handle) = self.0.lanes.get(queue_key) {
            return Ok(Arc::clone(&handle));
        }

        let row = get_or_create_lane(
            &self.0.pool,
            queue_key,
            self.0.config.debounce_ms,
            self.0.config.max_queued,
        )
        .await?;

        let sub_state = match row.state {
            LaneState::Idle => SubState::Idle,
            LaneState::Queued => SubState::Debouncing,
            LaneState::Running => SubState::Running,
        };
        let inner = LaneInner::new(
            sub_state,
            row.mode,
            row.is_paused,
            row.active_dispatch_id,
            row.debounce_ms,
            row.max_queued,
        );

        let handle = self
            .0
            .lanes
            .entry(queue_key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(inner)))
            .clone();
        Ok(handle)
    }

    /// Admit one message per §4.B's algorithm. Never returns an error for a
    /// business-level rejection — drops are reported via
    /// [`EnqueueOutcome::Dropped`]; the `Result` only carries storage
    /// failures.
    pub async fn enqueue(&self, request: EnqueueRequest) -> SessionQueueResult<EnqueueOutcome> {
        let handle = self.lane_handle(&request.queue_key).await?;
        let mut lane = handle.lock().await;

        if lane.is_paused {
            return Ok(EnqueueOutcome::Dropped(DropReason::LanePaused));
        }
        lane.agent_id.get_or_insert_with(|| request.agent_id.clone());
        lane.session_key
            .get_or_insert_with(|| request.session_key.clone());

        match lane.sub_state {
            SubState::Idle | SubState::Debouncing => {
                insert_message(
                    &self.0.pool,
                    &request.queue_key,
                    request.work_item_id,
                    &request.text,
                    request.sender_name.as_deref(),
                )
                .await?;

                lane.sub_state = SubState::Debouncing;
                lane.generation += 1;
                let debounce_until = Utc::now() + Duration::milliseconds(lane.debounce_ms);
                arm_debounce(&self.0.pool, &request.queue_key, debounce_until).await?;
                self.arm_timer(request.queue_key.clone(), lane.generation, lane.debounce_ms);
                Ok(EnqueueOutcome::Debouncing)
            }
            SubState::Running => match lane.mode {
                LaneMode::Collect | LaneMode::Steer => {
                    let pending = take_pending_messages(&self.0.pool, &request.queue_key).await?;
                    if pending.len() >= lane.max_queued as usize {
                        return Ok(EnqueueOutcome::Dropped(DropReason::QueueFull));
                    }
                    insert_message(
                        &self.0.pool,
                        &request.queue_key,
                        request.work_item_id,
                        &request.text,
                        request.sender_name.as_deref(),
                    )
                    .await?;
                    self.0.observer.on_queued(&request.queue_key);
                    Ok(EnqueueOutcome::Queued)
                }
                LaneMode::Followup => {
                    let active = lane
                        .active_dispatch_id
                        .expect("running lane must have an active dispatch");
                    let message_id = insert_message(
                        &self.0.pool,
                        &request.queue_key,
                        request.work_item_id,
                        &request.text,
                        request.sender_name.as_deref(),
                    )
                    .await?;

                    let run_key = format!("{}/{}", request.queue_key, Uuid::new_v4());
                    let dispatch_id = dispatch::insert_dispatch(
                        &self.0.pool,
                        &run_key,
                        &request.queue_key,
                        request.work_item_id,
                        lane.agent_id.as_deref().unwrap_or(&request.agent_id),
                        lane.session_key.as_ref().unwrap_or(&request.session_key),
                        &request.text,
                        &request.text,
                        Some(active),
                    )
                    .await?;
                    mark_messages_included(&self.0.pool, &[message_id], dispatch_id).await?;
                    Ok(EnqueueOutcome::Dispatched(dispatch_id))
                }
            },
        }
    }

    fn arm_timer(&self, queue_key: QueueKey, generation: u64, debounce_ms: i64) {
        let queue = self.clone();
        let delay = StdDuration::from_millis(u64::try_from(debounce_ms.max(0)).unwrap_or(0));
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(err) = queue.flush_debounce(&queue_key, generation).await {
                tracing::warn!(error = %err, queue_key = %queue_key, "debounce flush failed");
            }
        });
    }

    /// Coalesce a lane's currently pending messages into a new dispatch and
    /// mark it running, or mark the lane idle if nothing is pending.
    /// Assumes the caller already holds `lane`'s mutex.
    async fn flush_pending(
        &self,
        queue_key: &QueueKey,
        lane: &mut LaneInner,
    ) -> SessionQueueResult<Option<DispatchId>> {
        let messages = take_pending_messages(&self.0.pool, queue_key).await?;
        if messages.is_empty() {
            lane.sub_state = SubState::Idle;
            lane.active_dispatch_id = None;
            mark_idle(&self.0.pool, queue_key).await?;
            return Ok(None);
        }

        let coalesced = coalesce(&messages);
        let ids: Vec<Uuid> = messages.iter().map(|m| m.id).collect();
        let run_key = format!("{queue_key}/{}", Uuid::new_v4());
        let last = messages.last().expect("checked non-empty above");
        let agent_id = lane.agent_id.clone().unwrap_or_default();
        let session_key = lane
            .session_key
            .clone()
            .unwrap_or_else(|| SessionKey::new(queue_key.as_str()));

        let dispatch_id = dispatch::insert_dispatch(
            &self.0.pool,
            &run_key,
            queue_key,
            coalesced.response_work_item_id,
            &agent_id,
            &session_key,
            &last.text,
            &coalesced.text,
            None,
        )
        .await?;
        mark_messages_included(&self.0.pool, &ids, dispatch_id).await?;
        mark_running(&self.0.pool, queue_key, dispatch_id).await?;

        lane.sub_state = SubState::Running;
        lane.active_dispatch_id = Some(dispatch_id);
        Ok(Some(dispatch_id))
    }

    /// Flush a lane's debounce buffer into a new dispatch, unless a newer
    /// message has since reset the timer (`generation` mismatch) or the
    /// lane has already moved on.
    async fn flush_debounce(
        &self,
        queue_key: &QueueKey,
        expected_generation: u64,
    ) -> SessionQueueResult<()> {
        let handle = self.lane_handle(queue_key).await?;
        let mut lane = handle.lock().await;
        if lane.generation != expected_generation || lane.sub_state != SubState::Debouncing {
            return Ok(());
        }
        self.flush_pending(queue_key, &mut lane).await?;
        Ok(())
    }

    /// Called by the Run Dispatcher once a lane's active run finishes
    /// (§4.B "Contract"). Drains any pending-queue follow-ups into a new
    /// dispatch, or returns the lane to `idle`.
    pub async fn on_run_complete(
        &self,
        queue_key: &QueueKey,
    ) -> SessionQueueResult<Option<DispatchId>> {
        let handle = self.lane_handle(queue_key).await?;
        let mut lane = handle.lock().await;
        self.flush_pending(queue_key, &mut lane).await
    }

    /// Drop a lane's oldest pending message instead of including it,
    /// recording a [`MessageStatus::Cancelled`] terminal status.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SessionQueueError`] if storage rejects the update.
    pub async fn cancel_message(&self, message_id: Uuid) -> SessionQueueResult<()> {
        mark_message_status(&self.0.pool, message_id, MessageStatus::Cancelled).await?;
        Ok(())
    }

    /// Restart recovery sweep (§4.B "Durability"): reconciles in-DB lane
    /// state left behind by a crashed process, before any lane is touched
    /// in this process's lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SessionQueueError`] on any storage failure.
    pub async fn recover_on_startup(&self) -> SessionQueueResult<()> {
        let lanes = list_lanes_for_recovery(&self.0.pool).await?;
        for row in lanes {
            match row.state {
                LaneState::Running => {
                    mark_idle(&self.0.pool, &row.queue_key).await?;
                }
                LaneState::Queued => {
                    let handle = self.lane_handle(&row.queue_key).await?;
                    let mut lane = handle.lock().await;
                    self.flush_pending(&row.queue_key, &mut lane).await?;
                }
                LaneState::Idle => {}
            }
        }
        Ok(())
    }
}
