//! In-process event bus for fanning pipeline events (audit entries, hook
//! receipts) out to subscribers — metrics collectors, the CLI's `tail`
//! command, integration tests.
//!
//! This is in-process pub/sub only; durable persistence of the events this
//! bus carries is `switchyard-audit`'s job. Publishing here never blocks on
//! storage.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod event;

pub use event::{PipelineEvent, PipelineEventKind};

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::trace;

/// Default channel capacity for the event bus.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Broadcasts [`PipelineEvent`]s to any number of subscribers.
#[derive(Debug)]
pub struct EventBus {
    sender: broadcast::Sender<Arc<PipelineEvent>>,
}

impl EventBus {
    /// Create a new event bus with the default channel capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new event bus with the given channel capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers. Returns the number of
    /// receivers that got it; zero receivers is not an error.
    pub fn publish(&self, event: PipelineEvent) -> usize {
        let event = Arc::new(event);
        match self.sender.send(Arc::clone(&event)) {
            Ok(count) => count,
            Err(_) => {
                trace!(kind = ?event.kind, "no subscribers for pipeline event");
                0
            }
        }
    }

    /// Subscribe to all future events.
    #[must_use]
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            inner: self.sender.subscribe(),
        }
    }

    /// Current number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// A subscription handle returned by [`EventBus::subscribe`].
#[derive(Debug)]
pub struct EventReceiver {
    inner: broadcast::Receiver<Arc<PipelineEvent>>,
}

impl EventReceiver {
    /// Wait for the next published event. Returns `None` once the bus
    /// itself has been dropped; skips over any events missed due to a lag
    /// (broadcast channel overflow) rather than erroring the caller.
    pub async fn recv(&mut self) -> Option<Arc<PipelineEvent>> {
        loop {
            match self.inner.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::PipelineEventKind;

    #[tokio::test]
    async fn publish_is_received_by_subscriber() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        let sent = bus.publish(PipelineEvent::new(PipelineEventKind::WebhookAccepted));
        assert_eq!(sent, 1);

        let received = rx.recv().await.unwrap();
        assert_eq!(received.kind, PipelineEventKind::WebhookAccepted);
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_returns_zero() {
        let bus = EventBus::new();
        let sent = bus.publish(PipelineEvent::new(PipelineEventKind::HookReceipt));
        assert_eq!(sent, 0);
    }

    #[tokio::test]
    async fn multiple_subscribers_all_receive() {
        let bus = EventBus::new();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(PipelineEvent::new(PipelineEventKind::AutoDisable));
        assert!(rx1.recv().await.is_some());
        assert!(rx2.recv().await.is_some());
    }
}
