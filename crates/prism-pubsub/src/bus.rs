//! The pub/sub capability trait.

use std::pin::Pin;
use std::sync::Arc;

use futures_util::Stream;
use serde_json::Value;

/// A stream of event payloads for one subscriber.
///
/// Each subscriber owns an independent stream handle; a slow subscriber
/// never blocks delivery to its siblings.
pub type EventStream = Pin<Box<dyn Stream<Item = Value> + Send>>;

/// A shared handle to a pub/sub bus.
pub type PubSubHandle = Arc<dyn PubSub>;

/// A topic-keyed publish/subscribe facility.
///
/// Fan-out and per-subscriber delivery ordering are the bus's
/// responsibility. The gateway only requires that values published to a
/// topic reach every subscriber that was registered at publish time, in
/// publish order per subscriber.
pub trait PubSub: Send + Sync + 'static {
    /// Publish a payload to a topic.
    ///
    /// Fire-and-forget from the caller's perspective: returning does not
    /// mean any subscriber has consumed the event, only that it was handed
    /// to the bus. Publishing to a topic with no subscribers is a no-op.
    fn publish(&self, topic: &str, payload: Value);

    /// Subscribe to a topic, receiving every payload published after this
    /// call returns.
    ///
    /// Multiple independent subscribers per topic are supported; dropping
    /// the returned stream unsubscribes.
    fn subscribe(&self, topic: &str) -> EventStream;
}
