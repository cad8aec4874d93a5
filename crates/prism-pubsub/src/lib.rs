//! Publish/subscribe capability for the Prism gateway.
//!
//! The gateway core never delivers subscription events itself; it only
//! produces (`publish`) and consumes (`subscribe`) against a topic bus.
//! The bus is consumed through the [`PubSub`] trait so deployments can plug
//! in an external broker. [`MemoryPubSub`] is the in-process implementation
//! used by tests and single-node deployments.
//!
//! # Example
//!
//! ```rust,ignore
//! use prism_pubsub::{MemoryPubSub, PubSub};
//! use futures_util::StreamExt;
//!
//! let bus = MemoryPubSub::new();
//! let mut events = bus.subscribe("orders");
//! bus.publish("orders", serde_json::json!({"id": 42}));
//! let event = events.next().await;
//! ```

mod bus;
mod memory;

pub use bus::{EventStream, PubSub, PubSubHandle};
pub use memory::{MemoryPubSub, TopicStream};
