//! # Prism Server
//!
//! The unified serving core of the Prism GraphQL gateway. One listener
//! serves every configured surface:
//!
//! - GraphQL operations over HTTP POST, including multipart file uploads
//! - GraphQL subscriptions over a WebSocket upgrade on the same path
//! - Webhook paths bridged onto the in-process pub/sub bus
//! - Dynamically registered request handlers
//! - Static assets and the schema explorer page
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use prism_config::ServeConfig;
//! use prism_server::GatewayServer;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = GatewayServer::builder(
//!         ServeConfig::default(),
//!         Arc::new(my_executor()),
//!         Arc::new(my_context_builder()),
//!     )
//!     .build()?;
//!
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod bridge;
mod cors;
mod error;
mod gateway;
pub mod handlers;
mod listener;
mod playground;
mod router;
mod server;
pub mod shutdown;
mod static_files;
pub mod supervisor;
mod tls;
mod upload;

pub use error::{RequestError, StartupError};
pub use gateway::ExecutionGateway;
pub use handlers::{HandlerRegistry, HandlerRequest, HandlerResponse, NamedHandler};
pub use playground::ExampleDocument;
pub use server::{GatewayServer, GatewayServerBuilder, HttpResponse, ResponseBody};
pub use shutdown::{ConnectionTracker, ShutdownSignal};
