//! Dynamic handler registry.
//!
//! Configuration may mount extra request handlers by name. Handlers are
//! registered as typed functions before startup; every configured name is
//! resolved exactly once while building the router, and an unresolved
//! name aborts startup rather than leaving a reserved route unserved.

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode, Uri};

use prism_core::BoxFuture;
use prism_pubsub::PubSubHandle;

/// The raw request view handed to a dynamic handler.
#[derive(Clone)]
pub struct HandlerRequest {
    /// Request method.
    pub method: Method,
    /// Request URI.
    pub uri: Uri,
    /// Request headers.
    pub headers: HeaderMap,
    /// Collected request body.
    pub body: Bytes,
    /// Peer address, when known.
    pub remote_addr: Option<SocketAddr>,
    /// The worker's pub/sub bus, for handlers that publish or consume
    /// events alongside the gateway.
    pub bus: PubSubHandle,
}

impl std::fmt::Debug for HandlerRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRequest")
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("body_len", &self.body.len())
            .field("remote_addr", &self.remote_addr)
            .finish_non_exhaustive()
    }
}

/// The response a dynamic handler produces.
#[derive(Debug, Clone)]
pub struct HandlerResponse {
    /// Response status.
    pub status: StatusCode,
    /// Content type of the body.
    pub content_type: &'static str,
    /// Response body.
    pub body: Bytes,
}

impl HandlerResponse {
    /// A JSON response with the given status.
    #[must_use]
    pub fn json(status: StatusCode, value: &serde_json::Value) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: Bytes::from(value.to_string()),
        }
    }

    /// A plain-text response with the given status.
    #[must_use]
    pub fn text(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=utf-8",
            body: body.into(),
        }
    }
}

/// A request handler mountable by name from configuration.
///
/// Any `Fn(HandlerRequest) -> impl Future<Output = HandlerResponse>`
/// closure implements this trait.
pub trait NamedHandler: Send + Sync + 'static {
    /// Handle one request.
    fn handle(&self, request: HandlerRequest) -> BoxFuture<'static, HandlerResponse>;
}

impl<F, Fut> NamedHandler for F
where
    F: Fn(HandlerRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResponse> + Send + 'static,
{
    fn handle(&self, request: HandlerRequest) -> BoxFuture<'static, HandlerResponse> {
        Box::pin(self(request))
    }
}

/// Named handlers available to configuration-driven mounts.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn NamedHandler>>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under a name, replacing any previous entry.
    pub fn register<H>(&mut self, name: impl Into<String>, handler: H)
    where
        H: NamedHandler,
    {
        self.handlers.insert(name.into(), Arc::new(handler));
    }

    /// Look up a handler by name.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn NamedHandler>> {
        self.handlers.get(name).map(Arc::clone)
    }

    /// Whether a name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("names", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use prism_pubsub::MemoryPubSub;
    use serde_json::json;

    fn sample_request() -> HandlerRequest {
        HandlerRequest {
            method: Method::GET,
            uri: "/admin".parse().unwrap(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            remote_addr: None,
            bus: Arc::new(MemoryPubSub::new()),
        }
    }

    #[tokio::test]
    async fn test_register_and_invoke_closure() {
        let mut registry = HandlerRegistry::new();
        registry.register("adminPanel", |request: HandlerRequest| async move {
            HandlerResponse::json(
                StatusCode::OK,
                &json!({"path": request.uri.path()}),
            )
        });

        let handler = registry.resolve("adminPanel").unwrap();
        let response = handler.handle(sample_request()).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body, Bytes::from(r#"{"path":"/admin"}"#));
    }

    #[tokio::test]
    async fn test_handler_reaches_the_bus() {
        let mut registry = HandlerRegistry::new();
        registry.register("announce", |request: HandlerRequest| async move {
            request.bus.publish("announcements", json!({"from": "handler"}));
            HandlerResponse::text(StatusCode::ACCEPTED, "queued")
        });

        let request = sample_request();
        let mut events = request.bus.subscribe("announcements");

        let handler = registry.resolve("announce").unwrap();
        let response = handler.handle(request).await;
        assert_eq!(response.status, StatusCode::ACCEPTED);
        assert_eq!(events.next().await, Some(json!({"from": "handler"})));
    }

    #[test]
    fn test_unregistered_name_does_not_resolve() {
        let registry = HandlerRegistry::new();
        assert!(registry.resolve("missing").is_none());
        assert!(!registry.contains("missing"));
    }

    #[test]
    fn test_reregistration_replaces() {
        let mut registry = HandlerRegistry::new();
        registry.register("h", |_request: HandlerRequest| async {
            HandlerResponse::text(StatusCode::OK, "first")
        });
        registry.register("h", |_request: HandlerRequest| async {
            HandlerResponse::text(StatusCode::OK, "second")
        });
        assert_eq!(registry.len(), 1);
    }
}
