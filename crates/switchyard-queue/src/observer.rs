//! The callback surface a caller uses to react to lane signals that have no
//! durable event row of their own (§4.B "Emit an `onQueued` signal (typing
//! indicator, etc.)").

use switchyard_core::QueueKey;

/// Notified of lane signals that don't themselves warrant a persisted
/// event.
pub trait QueueObserver: Send + Sync {
    /// A message was accepted into the `running`-state pending queue.
    fn on_queued(&self, queue_key: &QueueKey) {
        let _ = queue_key;
    }
}

/// A [`QueueObserver`] that does nothing, for tests and for running without
/// a UI layer attached.
#[derive(Debug, Default)]
pub struct NoopQueueObserver;

impl QueueObserver for NoopQueueObserver {}
