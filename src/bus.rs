//! Publish/subscribe channel between the router, the resolver and the hosts.
//!
//! Each subscription is a bounded mpsc channel that only receives the
//! [`EventKind`]s it asked for. Events published from one task arrive at a
//! subscription in publish order.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::debug;

use crate::domain::{EventKind, UrlEvent};

pub const DEFAULT_CHANNEL_CAPACITY: usize = 100;

struct Subscription {
    kinds: Vec<EventKind>,
    tx: mpsc::Sender<UrlEvent>,
}

#[derive(Clone)]
pub struct EventBus {
    subscriptions: Arc<Mutex<Vec<Subscription>>>,
    capacity: usize,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            subscriptions: Arc::new(Mutex::new(Vec::new())),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Subscription>> {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Register interest in `kinds`. Dropping the receiver unsubscribes.
    pub fn subscribe(&self, kinds: &[EventKind]) -> mpsc::Receiver<UrlEvent> {
        let (tx, rx) = mpsc::channel(self.capacity);
        self.lock().push(Subscription {
            kinds: kinds.to_vec(),
            tx,
        });
        rx
    }

    /// Deliver `event` to every interested subscription and return how many
    /// received it.
    pub async fn publish(&self, event: UrlEvent) -> usize {
        let kind = event.kind();
        let targets: Vec<mpsc::Sender<UrlEvent>> = {
            let mut subscriptions = self.lock();
            subscriptions.retain(|s| !s.tx.is_closed());
            subscriptions
                .iter()
                .filter(|s| s.kinds.contains(&kind))
                .map(|s| s.tx.clone())
                .collect()
        };

        let mut delivered = 0;
        for tx in targets {
            match tx.send(event.clone()).await {
                Ok(()) => delivered += 1,
                Err(_) => debug!("Subscriber went away before {:?} was delivered", kind),
            }
        }

        if delivered == 0 {
            debug!("No subscriber for {:?} from {}", kind, event.origin());
        }
        delivered
    }

    /// Drop every subscription; receivers drain what is queued, then end.
    pub fn close(&self) {
        self.lock().clear();
    }

    pub fn subscriber_count(&self) -> usize {
        let mut subscriptions = self.lock();
        subscriptions.retain(|s| !s.tx.is_closed());
        subscriptions.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idle::IdleTracker;
    use url::Url;

    fn request(s: &str) -> UrlEvent {
        UrlEvent::ResolveRequest {
            origin: Url::parse(s).unwrap(),
            in_flight: Arc::new(IdleTracker::new().begin()),
        }
    }

    fn resolved(from: &str, to: &str) -> UrlEvent {
        UrlEvent::Resolved {
            origin: Url::parse(from).unwrap(),
            resolved: Url::parse(to).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_delivers_only_subscribed_kinds() {
        let bus = EventBus::new();
        let mut requests = bus.subscribe(&EventKind::REQUESTS);
        let mut terminal = bus.subscribe(&EventKind::TERMINAL);

        assert_eq!(bus.publish(request("http://bit.ly/a")).await, 1);
        assert_eq!(
            bus.publish(resolved("http://bit.ly/a", "http://test.com")).await,
            1
        );

        assert_eq!(requests.recv().await.unwrap().kind(), EventKind::ResolveRequest);
        assert!(requests.try_recv().is_err());
        assert_eq!(terminal.recv().await.unwrap().kind(), EventKind::Resolved);
        assert!(terminal.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_fans_out_to_every_subscriber() {
        let bus = EventBus::new();
        let mut first = bus.subscribe(&[EventKind::Resolved]);
        let mut second = bus.subscribe(&[EventKind::Resolved]);

        let event = resolved("http://bit.ly/a", "http://test.com");
        assert_eq!(bus.publish(event).await, 2);

        assert!(first.recv().await.is_some());
        assert!(second.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_preserves_publish_order() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe(&EventKind::REQUESTS);

        for i in 0..10 {
            bus.publish(request(&format!("http://bit.ly/{i}"))).await;
        }

        for i in 0..10 {
            let event = rx.recv().await.unwrap();
            assert_eq!(event.origin().path(), format!("/{i}"));
        }
    }

    #[tokio::test]
    async fn test_dropped_receiver_unsubscribes() {
        let bus = EventBus::new();
        let rx = bus.subscribe(&EventKind::REQUESTS);
        assert_eq!(bus.subscriber_count(), 1);

        drop(rx);
        assert_eq!(bus.publish(request("http://bit.ly/a")).await, 0);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_close_ends_receivers_after_drain() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe(&EventKind::REQUESTS);

        bus.publish(request("http://bit.ly/a")).await;
        bus.close();

        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_none());
    }
}
