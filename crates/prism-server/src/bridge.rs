//! Webhook to pub/sub bridge.
//!
//! Each configured webhook entry mounts a handler that reads the inbound
//! body, optionally narrows it through a dot-path, publishes the result
//! on the bus under the entry's topic, and acknowledges with `204`. The
//! acknowledgment never waits for subscribers; publishes are
//! fire-and-forget from the caller's perspective.

use bytes::Bytes;
use http::{Response, StatusCode};
use http_body_util::Full;
use serde_json::Value;
use tracing::debug;

use prism_pubsub::PubSubHandle;

/// Handle one inbound webhook request.
///
/// A body that is not valid JSON, or a `payload_path` that resolves to
/// nothing, publishes `null` rather than failing: a webhook delivery is
/// always acknowledged.
pub fn handle_webhook(
    bus: &PubSubHandle,
    topic: &str,
    payload_path: Option<&str>,
    body: &Bytes,
) -> Response<Full<Bytes>> {
    let parsed: Value = serde_json::from_slice(body).unwrap_or(Value::Null);
    let payload = match payload_path {
        Some(path) => extract_path(&parsed, path),
        None => parsed,
    };

    debug!(topic, "publishing webhook payload");
    bus.publish(topic, payload);

    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}

/// Resolve a dot-path within a JSON value.
///
/// `"event.id"` applied to `{"event":{"id":42}}` yields `42`. A missing
/// segment yields `Value::Null`; array segments accept numeric indices.
pub fn extract_path(value: &Value, path: &str) -> Value {
    let mut current = value;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => match map.get(segment) {
                Some(next) => next,
                None => return Value::Null,
            },
            Value::Array(items) => match segment.parse::<usize>().ok().and_then(|i| items.get(i)) {
                Some(next) => next,
                None => return Value::Null,
            },
            _ => return Value::Null,
        };
    }
    current.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use prism_pubsub::{MemoryPubSub, PubSub};
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_extract_nested_field() {
        let body = json!({"event": {"id": 42}});
        assert_eq!(extract_path(&body, "event"), json!({"id": 42}));
        assert_eq!(extract_path(&body, "event.id"), json!(42));
    }

    #[test]
    fn test_extract_missing_field_is_null() {
        let body = json!({"event": {"id": 42}});
        assert_eq!(extract_path(&body, "missing"), Value::Null);
        assert_eq!(extract_path(&body, "event.missing.deeper"), Value::Null);
    }

    #[test]
    fn test_extract_array_index() {
        let body = json!({"items": [{"sku": "a"}, {"sku": "b"}]});
        assert_eq!(extract_path(&body, "items.1.sku"), json!("b"));
        assert_eq!(extract_path(&body, "items.9"), Value::Null);
        assert_eq!(extract_path(&body, "items.x"), Value::Null);
    }

    #[tokio::test]
    async fn test_webhook_publishes_extracted_payload() {
        let bus = Arc::new(MemoryPubSub::new());
        let mut events = bus.subscribe("github");

        let handle: PubSubHandle = bus;
        let body = Bytes::from(r#"{"event":{"id":42}}"#);
        let response = handle_webhook(&handle, "github", Some("event"), &body);

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(events.next().await, Some(json!({"id": 42})));
    }

    #[tokio::test]
    async fn test_webhook_without_path_publishes_whole_body() {
        let bus = Arc::new(MemoryPubSub::new());
        let mut events = bus.subscribe("raw");

        let handle: PubSubHandle = bus;
        let body = Bytes::from(r#"{"a":1}"#);
        handle_webhook(&handle, "raw", None, &body);

        assert_eq!(events.next().await, Some(json!({"a": 1})));
    }

    #[tokio::test]
    async fn test_webhook_acknowledges_without_subscribers() {
        let bus: PubSubHandle = Arc::new(MemoryPubSub::new());
        let response = handle_webhook(&bus, "nobody", None, &Bytes::from("{}"));
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_non_json_body_publishes_null() {
        let bus = Arc::new(MemoryPubSub::new());
        let mut events = bus.subscribe("odd");

        let handle: PubSubHandle = bus;
        handle_webhook(&handle, "odd", Some("field"), &Bytes::from("not json"));

        assert_eq!(events.next().await, Some(Value::Null));
    }
}
