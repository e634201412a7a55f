//! Outbound push channel to the worker.
//!
//! The engine only needs somewhere to publish work; the transport behind it
//! (websocket fan-out here) is swappable.

use tokio::sync::broadcast;

use crate::event::WorkerEvent;

/// Fire-and-forget publisher for worker events.
pub trait Outbound: Send + Sync {
    /// Publish an event. Returns how many subscribers it was handed to;
    /// zero means no worker is attached right now.
    fn publish(&self, event: WorkerEvent) -> usize;

    /// Number of attached subscribers.
    fn subscriber_count(&self) -> usize;
}

/// Tokio broadcast channel. Each connected worker socket holds a receiver.
#[derive(Debug, Clone)]
pub struct BroadcastOutbound {
    tx: broadcast::Sender<WorkerEvent>,
}

impl BroadcastOutbound {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Attach a new subscriber. It sees only events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<WorkerEvent> {
        self.tx.subscribe()
    }
}

impl Outbound for BroadcastOutbound {
    fn publish(&self, event: WorkerEvent) -> usize {
        // Err only means nobody is listening
        self.tx.send(event).unwrap_or(0)
    }

    fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_without_subscribers_is_not_an_error() {
        let outbound = BroadcastOutbound::new(4);
        assert_eq!(outbound.publish(WorkerEvent::connected()), 0);
    }

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let outbound = BroadcastOutbound::new(4);
        let mut rx = outbound.subscribe();

        assert_eq!(outbound.subscriber_count(), 1);
        assert_eq!(outbound.publish(WorkerEvent::connected()), 1);
        assert_eq!(rx.recv().await.unwrap(), WorkerEvent::connected());
    }
}
