//! In-process topic bus.
//!
//! [`MemoryPubSub`] keeps a registry of live subscriber channels per topic.
//! Every subscriber gets its own unbounded channel, so delivery to one
//! subscriber is never gated on another's consumption rate.

use std::pin::Pin;
use std::task::{Context, Poll};

use dashmap::DashMap;
use futures_util::Stream;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::trace;

use crate::bus::{EventStream, PubSub};

/// An in-process pub/sub bus.
///
/// Cloneable via `Arc`; all clones share the same topic registry.
///
/// # Example
///
/// ```rust,ignore
/// use prism_pubsub::{MemoryPubSub, PubSub};
///
/// let bus = MemoryPubSub::new();
/// let stream = bus.subscribe("webhooks.github");
/// bus.publish("webhooks.github", serde_json::json!({"action": "opened"}));
/// ```
#[derive(Debug, Default)]
pub struct MemoryPubSub {
    /// Live subscriber senders, keyed by topic.
    topics: DashMap<String, Vec<mpsc::UnboundedSender<Value>>>,
}

impl MemoryPubSub {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscribers for a topic.
    #[must_use]
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .get(topic)
            .map(|senders| senders.iter().filter(|s| !s.is_closed()).count())
            .unwrap_or(0)
    }
}

impl PubSub for MemoryPubSub {
    fn publish(&self, topic: &str, payload: Value) {
        let Some(mut senders) = self.topics.get_mut(topic) else {
            trace!(topic, "publish to topic with no subscribers");
            return;
        };

        // Deliver to every live subscriber and drop channels whose
        // receiving stream has gone away.
        senders.retain(|sender| sender.send(payload.clone()).is_ok());
    }

    fn subscribe(&self, topic: &str) -> EventStream {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.topics.entry(topic.to_string()).or_default().push(sender);
        trace!(topic, "new subscriber");
        Box::pin(TopicStream { receiver })
    }
}

/// A single subscriber's view of a topic.
///
/// Dropping the stream closes its channel; the bus prunes the dead sender
/// on the next publish to the topic.
pub struct TopicStream {
    receiver: mpsc::UnboundedReceiver<Value>,
}

impl Stream for TopicStream {
    type Item = Value;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use serde_json::json;

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let bus = MemoryPubSub::new();
        let mut stream = bus.subscribe("orders");

        bus.publish("orders", json!({"id": 1}));

        assert_eq!(stream.next().await, Some(json!({"id": 1})));
    }

    #[tokio::test]
    async fn test_publish_order_preserved_per_subscriber() {
        let bus = MemoryPubSub::new();
        let mut stream = bus.subscribe("orders");

        bus.publish("orders", json!(1));
        bus.publish("orders", json!(2));
        bus.publish("orders", json!(3));

        assert_eq!(stream.next().await, Some(json!(1)));
        assert_eq!(stream.next().await, Some(json!(2)));
        assert_eq!(stream.next().await, Some(json!(3)));
    }

    #[tokio::test]
    async fn test_multiple_independent_subscribers() {
        let bus = MemoryPubSub::new();
        let mut first = bus.subscribe("events");
        let mut second = bus.subscribe("events");

        bus.publish("events", json!("hello"));

        assert_eq!(first.next().await, Some(json!("hello")));
        assert_eq!(second.next().await, Some(json!("hello")));
    }

    #[tokio::test]
    async fn test_slow_subscriber_does_not_block_siblings() {
        let bus = MemoryPubSub::new();
        let _slow = bus.subscribe("events");
        let mut fast = bus.subscribe("events");

        // The slow subscriber never polls; the fast one still sees
        // every event immediately.
        for i in 0..100 {
            bus.publish("events", json!(i));
        }
        assert_eq!(fast.next().await, Some(json!(0)));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_noop() {
        let bus = MemoryPubSub::new();
        bus.publish("nobody-home", json!(null));
        assert_eq!(bus.subscriber_count("nobody-home"), 0);
    }

    #[tokio::test]
    async fn test_dropped_subscriber_is_pruned() {
        let bus = MemoryPubSub::new();
        let stream = bus.subscribe("events");
        assert_eq!(bus.subscriber_count("events"), 1);

        drop(stream);
        bus.publish("events", json!("after-drop"));
        assert_eq!(bus.subscriber_count("events"), 0);
    }

    #[tokio::test]
    async fn test_subscribe_misses_earlier_events() {
        let bus = MemoryPubSub::new();
        bus.publish("events", json!("before"));

        let mut stream = bus.subscribe("events");
        bus.publish("events", json!("after"));

        assert_eq!(stream.next().await, Some(json!("after")));
    }
}
