//! The executable-schema capability.
//!
//! Query parsing, validation, and execution internals live outside this
//! core; the gateway consumes them through [`SchemaExecutor`]. The schema
//! and the executor are read-only and shared across all requests within a
//! worker process.

use std::pin::Pin;

use futures_util::Stream;

use crate::context::{BoxFuture, ExecutionContext};
use crate::request::{GraphQLError, GraphQLRequest, GraphQLResponse};

/// The async sequence of results produced by a subscription operation.
///
/// An `Err` item ends the sequence: the gateway delivers it as a tagged
/// `error` frame and discards the session.
pub type SubscriptionStream =
    Pin<Box<dyn Stream<Item = Result<GraphQLResponse, GraphQLError>> + Send>>;

/// An executable schema.
///
/// One instance is shared (read-only) across every request a worker
/// serves. Implementations must not block; resolver I/O suspends at await
/// points like everything else on the event loop.
pub trait SchemaExecutor: Send + Sync + 'static {
    /// Execute a single-shot operation (query or mutation).
    ///
    /// Execution failures are carried inside the returned response's error
    /// list; this method itself is infallible at the transport level.
    fn execute(
        &self,
        request: GraphQLRequest,
        ctx: ExecutionContext,
    ) -> BoxFuture<'static, GraphQLResponse>;

    /// Start a subscription operation, yielding its result sequence.
    ///
    /// A setup failure (unparseable document, unknown subscription field)
    /// is returned as `Err` before any value is produced.
    fn subscribe(
        &self,
        request: GraphQLRequest,
        ctx: ExecutionContext,
    ) -> BoxFuture<'static, Result<SubscriptionStream, GraphQLError>>;
}
