//! Per-request and per-connection execution context.
//!
//! The gateway builds exactly one [`ExecutionContext`] per HTTP request and
//! one per WebSocket connection, by invoking the caller-supplied
//! [`ContextBuilder`] with a [`ContextRequest`] view of the raw inbound
//! request. Contexts are never reused or cached across requests.

use std::any::Any;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;

use http::{HeaderMap, Method, Uri};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use prism_pubsub::PubSubHandle;

use crate::request::GraphQLError;

/// A boxed future, used at the capability seams.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A unique identifier for each request, using UUID v7.
///
/// UUID v7 is time-ordered, which makes it ideal for request tracking
/// and log correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new unique request ID using UUID v7.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `RequestId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which transport carried the inbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// Plain HTTP request (query/mutation or webhook/dynamic handler).
    Http,
    /// WebSocket upgrade request (subscription connection).
    WebSocket,
}

/// A raw-request-like view handed to context builders.
///
/// Carries everything a builder may want to inspect: method, URI, headers,
/// parsed cookies, and the peer address. The body is deliberately absent;
/// contexts are built before (HTTP) or without (WebSocket) body parsing.
#[derive(Debug, Clone)]
pub struct ContextRequest {
    /// Request method (always GET for WebSocket upgrades).
    pub method: Method,
    /// Request URI.
    pub uri: Uri,
    /// Request headers.
    pub headers: HeaderMap,
    /// Cookies parsed from the `Cookie` header.
    pub cookies: Vec<(String, String)>,
    /// Peer address, when known.
    pub remote_addr: Option<SocketAddr>,
    /// Transport the request arrived on.
    pub transport: Transport,
}

impl ContextRequest {
    /// Build a view from request parts, parsing the `Cookie` header.
    #[must_use]
    pub fn new(
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        remote_addr: Option<SocketAddr>,
        transport: Transport,
    ) -> Self {
        let cookies = parse_cookies(&headers);
        Self {
            method,
            uri,
            headers,
            cookies,
            remote_addr,
            transport,
        }
    }

    /// Look up a header value as a string.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Look up a cookie by name.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Parse the `Cookie` header into name/value pairs.
///
/// Malformed pairs are skipped rather than failing the request.
fn parse_cookies(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .get(http::header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(|raw| {
            raw.split(';')
                .filter_map(|pair| {
                    let (name, value) = pair.split_once('=')?;
                    let name = name.trim();
                    if name.is_empty() {
                        return None;
                    }
                    Some((name.to_string(), value.trim().to_string()))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// The caller's opaque context state.
pub type ContextState = Arc<dyn Any + Send + Sync>;

/// The per-operation (HTTP) or per-connection (WebSocket) context threaded
/// into schema execution.
///
/// The bus handle is part of the context value — it is passed explicitly to
/// every downstream consumer, never attached to a shared request object.
#[derive(Clone)]
pub struct ExecutionContext {
    request_id: RequestId,
    bus: PubSubHandle,
    state: ContextState,
}

impl ExecutionContext {
    /// Assemble a context from the builder's state and the worker's bus.
    #[must_use]
    pub fn new(request_id: RequestId, bus: PubSubHandle, state: ContextState) -> Self {
        Self {
            request_id,
            bus,
            state,
        }
    }

    /// The request (HTTP) or connection (WebSocket) id.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// The pub/sub bus handle for this worker.
    #[must_use]
    pub fn bus(&self) -> &PubSubHandle {
        &self.bus
    }

    /// Downcast the caller-built state to a concrete type.
    #[must_use]
    pub fn state<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.state.downcast_ref::<T>()
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("request_id", &self.request_id)
            .finish_non_exhaustive()
    }
}

/// The caller-supplied context-construction function.
///
/// Invoked once per HTTP request and once per WebSocket connection. A build
/// failure surfaces in the GraphQL response error list (or as a tagged
/// `error` frame for subscriptions), never as a transport failure.
///
/// Any `Fn(ContextRequest) -> impl Future<Output = Result<ContextState, GraphQLError>>`
/// closure implements this trait.
pub trait ContextBuilder: Send + Sync + 'static {
    /// Build the opaque context state from the raw request view.
    fn build(&self, request: ContextRequest) -> BoxFuture<'static, Result<ContextState, GraphQLError>>;
}

impl<F, Fut> ContextBuilder for F
where
    F: Fn(ContextRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ContextState, GraphQLError>> + Send + 'static,
{
    fn build(&self, request: ContextRequest) -> BoxFuture<'static, Result<ContextState, GraphQLError>> {
        Box::pin(self(request))
    }
}

/// A context builder producing empty state, for callers that need none.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyContextBuilder;

impl ContextBuilder for EmptyContextBuilder {
    fn build(&self, _request: ContextRequest) -> BoxFuture<'static, Result<ContextState, GraphQLError>> {
        Box::pin(async { Ok(Arc::new(()) as ContextState) })
    }
}
