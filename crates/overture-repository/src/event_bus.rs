//! In-process event bus carrying store changes and invalidation requests.
//!
//! Each subscriber owns a bounded crossbeam channel backed by an overflow
//! queue. Publishing never blocks and never loses an event: once a channel is
//! full, further events for that subscriber queue up in order until the
//! subscriber catches up.

use crate::error::{RepositoryError, Result};
use crate::events::RepositoryEvent;
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Default per-subscriber capacity.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Event plus delivery metadata.
#[derive(Debug, Clone)]
pub struct EventEnvelope {
    /// Unique envelope ID.
    pub id: u64,
    /// Publisher name.
    pub source: String,
    /// Topic the event was published under.
    pub topic: &'static str,
    /// Event.
    pub event: RepositoryEvent,
    /// Publication time.
    pub timestamp: Instant,
}

impl EventEnvelope {
    fn new(source: impl Into<String>, event: RepositoryEvent) -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);

        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            source: source.into(),
            topic: event.topic(),
            event,
            timestamp: Instant::now(),
        }
    }
}

/// Receiving end of a subscription.
#[derive(Debug)]
pub struct EventSubscription {
    /// Subscription ID.
    pub id: u64,
    /// Subscriber name.
    pub name: String,
    /// Topic filter (`None` for all topics).
    pub topic_filter: Option<String>,
    receiver: Receiver<EventEnvelope>,
    overflow: Arc<Mutex<VecDeque<EventEnvelope>>>,
}

impl EventSubscription {
    /// Receive an event (blocking).
    ///
    /// # Errors
    /// Returns error once the subscription is removed from the bus.
    pub fn recv(&self) -> Result<EventEnvelope> {
        if let Some(envelope) = self.try_recv() {
            return Ok(envelope);
        }
        self.receiver
            .recv()
            .map_err(|e| RepositoryError::Channel(e.to_string()))
    }

    /// Receive an event without blocking.
    #[must_use]
    pub fn try_recv(&self) -> Option<EventEnvelope> {
        // Channel entries always predate queued overflow.
        self.receiver
            .try_recv()
            .ok()
            .or_else(|| self.overflow.lock().pop_front())
    }

    /// Receive an event, waiting at most `timeout`.
    ///
    /// # Errors
    /// Returns error on timeout or once the subscription is removed.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<EventEnvelope> {
        if let Some(envelope) = self.try_recv() {
            return Ok(envelope);
        }
        self.receiver
            .recv_timeout(timeout)
            .map_err(|e| RepositoryError::Channel(e.to_string()))
    }

    /// Drain every pending event.
    #[must_use]
    pub fn drain(&self) -> Vec<EventEnvelope> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

struct Subscriber {
    sender: Sender<EventEnvelope>,
    overflow: Arc<Mutex<VecDeque<EventEnvelope>>>,
    topic_filter: Option<String>,
    name: String,
}

enum Delivery {
    Sent,
    Queued { first: bool },
    Disconnected,
}

impl Subscriber {
    /// Hand `envelope` to the channel, or to the overflow queue when the
    /// channel is full or earlier events are still queued.
    fn deliver(&self, envelope: EventEnvelope) -> Delivery {
        let mut overflow = self.overflow.lock();
        if !overflow.is_empty() {
            overflow.push_back(envelope);
            return Delivery::Queued { first: false };
        }
        match self.sender.try_send(envelope) {
            Ok(()) => Delivery::Sent,
            Err(TrySendError::Full(envelope)) => {
                overflow.push_back(envelope);
                Delivery::Queued { first: true }
            }
            Err(TrySendError::Disconnected(_)) => Delivery::Disconnected,
        }
    }
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("topic_filter", &self.topic_filter)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Delivery statistics.
#[derive(Debug, Default)]
pub struct EventBusStats {
    /// Events published.
    pub published: AtomicU64,
    /// Deliveries made (one event may reach several subscribers).
    pub delivered: AtomicU64,
    /// Events no subscriber received.
    pub dropped: AtomicU64,
    /// Deliveries queued because the subscriber's channel was full.
    pub overflowed: AtomicU64,
    /// Active subscriptions.
    pub active_subscribers: AtomicU64,
}

/// Topic-filtered event bus.
#[derive(Debug)]
pub struct EventBus {
    subscribers: DashMap<u64, Arc<Subscriber>>,
    next_id: AtomicU64,
    capacity: usize,
    stats: EventBusStats,
}

impl EventBus {
    /// Create a bus whose subscriber channels hold `capacity` events before
    /// spilling into the overflow queue.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: DashMap::new(),
            next_id: AtomicU64::new(1),
            capacity,
            stats: EventBusStats::default(),
        }
    }

    /// Subscribe to every topic.
    #[must_use]
    pub fn subscribe(&self, name: impl Into<String>) -> EventSubscription {
        self.subscribe_filtered(name, None)
    }

    /// Subscribe to a topic; a trailing `*` matches any suffix.
    #[must_use]
    pub fn subscribe_to_topic(
        &self,
        name: impl Into<String>,
        topic: impl Into<String>,
    ) -> EventSubscription {
        self.subscribe_filtered(name, Some(topic.into()))
    }

    fn subscribe_filtered(
        &self,
        name: impl Into<String>,
        topic_filter: Option<String>,
    ) -> EventSubscription {
        let (sender, receiver) = bounded(self.capacity);
        let overflow = Arc::new(Mutex::new(VecDeque::new()));
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let name = name.into();

        self.subscribers.insert(
            id,
            Arc::new(Subscriber {
                sender,
                overflow: overflow.clone(),
                topic_filter: topic_filter.clone(),
                name: name.clone(),
            }),
        );
        self.stats
            .active_subscribers
            .fetch_add(1, Ordering::Relaxed);

        debug!(id, subscriber = %name, topic = ?topic_filter, "new subscription");

        EventSubscription {
            id,
            name,
            topic_filter,
            receiver,
            overflow,
        }
    }

    /// Remove a subscription. Its receiver disconnects once drained.
    pub fn unsubscribe(&self, subscription_id: u64) {
        if self.subscribers.remove(&subscription_id).is_some() {
            self.stats
                .active_subscribers
                .fetch_sub(1, Ordering::Relaxed);
            debug!(id = subscription_id, "subscription removed");
        }
    }

    /// Publish an event; returns how many subscribers received it.
    ///
    /// Subscribers never receive their own events.
    pub fn publish(&self, source: impl Into<String>, event: impl Into<RepositoryEvent>) -> usize {
        let envelope = EventEnvelope::new(source, event.into());
        trace!(
            id = envelope.id,
            source = %envelope.source,
            topic = envelope.topic,
            "publishing event"
        );
        self.stats.published.fetch_add(1, Ordering::Relaxed);

        let mut delivered = 0u64;
        for entry in &self.subscribers {
            let subscriber = entry.value();
            if !Self::should_deliver(&envelope, subscriber) {
                continue;
            }
            match subscriber.deliver(envelope.clone()) {
                Delivery::Sent => delivered += 1,
                Delivery::Queued { first } => {
                    delivered += 1;
                    self.stats.overflowed.fetch_add(1, Ordering::Relaxed);
                    if first {
                        warn!(
                            subscriber = %subscriber.name,
                            topic = envelope.topic,
                            "subscriber channel full, queueing events"
                        );
                    }
                }
                Delivery::Disconnected => {}
            }
        }

        self.stats.delivered.fetch_add(delivered, Ordering::Relaxed);
        if delivered == 0 {
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
        }
        usize::try_from(delivered).unwrap_or(usize::MAX)
    }

    /// Statistics.
    #[must_use]
    pub const fn stats(&self) -> &EventBusStats {
        &self.stats
    }

    /// Number of subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn should_deliver(envelope: &EventEnvelope, subscriber: &Subscriber) -> bool {
        if envelope.source == subscriber.name {
            return false;
        }
        subscriber
            .topic_filter
            .as_deref()
            .is_none_or(|filter| Self::topic_matches(envelope.topic, filter))
    }

    fn topic_matches(topic: &str, filter: &str) -> bool {
        if filter.is_empty() || filter == "*" {
            return true;
        }
        if let Some(prefix) = filter.strip_suffix('*') {
            return topic.starts_with(prefix);
        }
        topic == filter
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{AssetEvent, ChangeKind, InvalidationRequest};
    use overture_core::PackageName;

    fn asset(kind: ChangeKind) -> AssetEvent {
        AssetEvent::zipball(kind, "php-hosted", &PackageName::new("acme", "widgets"))
    }

    #[test]
    fn delivers_to_every_matching_subscriber() {
        let bus = EventBus::new(16);
        let all = bus.subscribe("audit");
        let assets = bus.subscribe_to_topic("controller", "asset.*");
        let invalidations = bus.subscribe_to_topic("rebuilder", "index.invalidate");

        assert_eq!(bus.publish("store", asset(ChangeKind::Created)), 2);
        assert!(all.try_recv().is_some());
        assert!(assets.try_recv().is_some());
        assert!(invalidations.try_recv().is_none());

        let request = InvalidationRequest::new("php-hosted", &PackageName::new("acme", "widgets"));
        assert_eq!(bus.publish("controller", request.clone()), 2);
        let envelope = invalidations.try_recv().unwrap();
        assert_eq!(envelope.event, RepositoryEvent::Invalidation(request));
        assert_eq!(envelope.source, "controller");
        assert!(assets.try_recv().is_none());
    }

    #[test]
    fn no_self_delivery() {
        let bus = EventBus::new(16);
        let sub = bus.subscribe("store");
        assert_eq!(bus.publish("store", asset(ChangeKind::Deleted)), 0);
        assert!(sub.try_recv().is_none());
        assert_eq!(bus.stats().dropped.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn full_channel_queues_without_blocking() {
        let bus = EventBus::new(1);
        let sub = bus.subscribe("slow");
        let widgets = PackageName::new("acme", "widgets");
        let gadgets = PackageName::new("acme", "gadgets");
        assert_eq!(bus.publish("controller", InvalidationRequest::new("php-hosted", &widgets)), 1);
        assert_eq!(bus.publish("controller", InvalidationRequest::new("php-hosted", &gadgets)), 1);
        assert_eq!(bus.publish("store", asset(ChangeKind::Updated)), 1);
        assert_eq!(bus.stats().overflowed.load(Ordering::Relaxed), 2);

        let received: Vec<_> = sub.drain().into_iter().map(|e| e.event).collect();
        assert_eq!(
            received,
            vec![
                RepositoryEvent::Invalidation(InvalidationRequest::new("php-hosted", &widgets)),
                RepositoryEvent::Invalidation(InvalidationRequest::new("php-hosted", &gadgets)),
                RepositoryEvent::Asset(asset(ChangeKind::Updated)),
            ]
        );

        // Once drained, delivery goes through the channel again.
        assert_eq!(bus.publish("store", asset(ChangeKind::Deleted)), 1);
        assert_eq!(bus.stats().overflowed.load(Ordering::Relaxed), 2);
        assert!(sub.try_recv().is_some());
    }

    #[test]
    fn queued_events_survive_unsubscribe() {
        let bus = EventBus::new(1);
        let sub = bus.subscribe("worker");
        bus.publish("store", asset(ChangeKind::Created));
        bus.publish("store", asset(ChangeKind::Updated));
        bus.unsubscribe(sub.id);
        assert!(sub.recv().is_ok());
        assert!(sub.recv().is_ok());
        assert!(sub.recv().is_err());
    }

    #[test]
    fn unsubscribe_disconnects() {
        let bus = EventBus::new(4);
        let sub = bus.subscribe("worker");
        bus.publish("store", asset(ChangeKind::Created));
        bus.unsubscribe(sub.id);
        assert_eq!(bus.subscriber_count(), 0);
        assert!(sub.recv().is_ok());
        assert!(sub.recv().is_err());
        assert_eq!(bus.stats().active_subscribers.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn topic_matching() {
        assert!(EventBus::topic_matches("asset.created", "*"));
        assert!(EventBus::topic_matches("asset.created", ""));
        assert!(EventBus::topic_matches("asset.created", "asset.*"));
        assert!(EventBus::topic_matches("asset.created", "asset.created"));
        assert!(!EventBus::topic_matches("asset.created", "index.*"));
    }
}
