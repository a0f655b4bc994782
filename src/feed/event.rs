//! Notifications from the aggregator to whoever renders the feed.
//!
//! Subscribing is optional; the store, active index and status are all
//! observable directly.  The terminal UI drains these once per tick to
//! update its status line.

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::source::{ProviderError, ProviderId, ProviderQuery};

/// Messages sent from the aggregator to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// A page arrived; `appended` of its `received` items were new.
    Loaded {
        provider: ProviderId,
        received: usize,
        appended: usize,
    },
    /// The provider has nothing further for this query.
    Exhausted { provider: ProviderId },
    /// A fetch failed.  `gave_up` means the backoff budget is spent.
    Failed {
        provider: ProviderId,
        error: ProviderError,
        gave_up: bool,
    },
    /// A response issued before the last reset was thrown away.
    Discarded { provider: ProviderId, epoch: u64 },
    /// The feed was cleared for a new query.
    Reset { epoch: u64, query: ProviderQuery },
}

/// Fan-out to any number of unbounded subscribers.
#[derive(Debug, Default)]
pub(crate) struct EventBus {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<FeedEvent>>>,
}

impl EventBus {
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<FeedEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Deliver `event`; subscribers whose receiver is gone are dropped.
    pub fn emit(&self, event: FeedEvent) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_reaches_every_subscriber() {
        let bus = EventBus::default();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        bus.emit(FeedEvent::Exhausted { provider: "x".into() });
        assert_eq!(a.try_recv().unwrap(), FeedEvent::Exhausted { provider: "x".into() });
        assert!(b.try_recv().is_ok());
    }

    #[test]
    fn closed_receivers_are_pruned() {
        let bus = EventBus::default();
        drop(bus.subscribe());
        bus.emit(FeedEvent::Exhausted { provider: "x".into() });
        assert!(bus.subscribers.lock().is_empty());
    }
}
