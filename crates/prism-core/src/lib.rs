//! Core types and capability traits for the Prism GraphQL gateway.
//!
//! This crate defines the seams between the serving core and its external
//! collaborators:
//!
//! - [`SchemaExecutor`] — the executable schema, consumed as an
//!   `execute`/`subscribe` capability. Schema construction, merging, and
//!   transformation happen elsewhere.
//! - [`ContextBuilder`] — the caller-supplied context-construction function,
//!   invoked once per HTTP request and once per WebSocket connection.
//! - [`ExecutionContext`] — the per-request/per-connection value threaded
//!   through execution, carrying the request id, the pub/sub bus handle,
//!   and the caller's opaque state.
//!
//! Wire-level GraphQL request/response types live in [`request`], and the
//! upload handle produced by the multipart adapter lives in [`upload`].

mod context;
mod executor;
pub mod request;
pub mod upload;

pub use context::{
    BoxFuture, ContextBuilder, ContextRequest, ContextState, EmptyContextBuilder,
    ExecutionContext, RequestId, Transport,
};
pub use executor::{SchemaExecutor, SubscriptionStream};
pub use request::{GraphQLError, GraphQLRequest, GraphQLResponse};
pub use upload::UploadedFile;
