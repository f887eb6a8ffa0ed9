//! Topic-keyed event delivery
//!
//! Delivery is at-least-once per live subscriber and unordered across
//! distinct event types. A subscriber that falls behind is told how much
//! it missed instead of silently losing events, so it can fall back to a
//! full refresh.

use super::event::Event;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::debug;

/// Buffered events per topic before slow subscribers start lagging
const TOPIC_CAPACITY: usize = 256;

/// One received item from a subscription.
#[derive(Debug, Clone)]
pub enum Delivery {
    Event(Event),
    /// The subscriber fell behind and this many events were dropped for
    /// it. Full refresh is the correct recovery.
    Lagged(u64),
}

/// A live subscription to one topic.
///
/// Dropping the subscription ends delivery to it; closing the topic at
/// the bus ends delivery for every subscriber on it.
pub struct Subscription {
    topic: String,
    receiver: broadcast::Receiver<Event>,
}

impl Subscription {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// The next delivery, or `None` once the topic is closed and drained.
    pub async fn next(&mut self) -> Option<Delivery> {
        match self.receiver.recv().await {
            Ok(event) => Some(Delivery::Event(event)),
            Err(broadcast::error::RecvError::Lagged(skipped)) => Some(Delivery::Lagged(skipped)),
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }
}

/// Fan-out bus keyed by topic string.
#[derive(Debug, Default)]
pub struct EventBus {
    topics: DashMap<String, broadcast::Sender<Event>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            topics: DashMap::new(),
        }
    }

    /// Subscribe to a topic, creating it if needed.
    pub fn subscribe(&self, topic: &str) -> Subscription {
        let receiver = self
            .topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0)
            .subscribe();
        Subscription {
            topic: topic.to_string(),
            receiver,
        }
    }

    /// Publish an event to a topic. Returns how many subscribers will see
    /// it; an unknown topic (or one with no subscribers) delivers to zero.
    pub fn publish(&self, topic: &str, event: Event) -> usize {
        match self.topics.get(topic) {
            Some(sender) => sender.send(event).unwrap_or(0),
            None => 0,
        }
    }

    /// Close a topic: every subscription on it drains and then ends.
    ///
    /// Must be called when the scope that owns the topic deactivates, so
    /// stale events are never delivered into a dead scope.
    pub fn unsubscribe(&self, topic: &str) {
        if self.topics.remove(topic).is_some() {
            debug!(topic, "closed topic");
        }
    }

    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }
}
