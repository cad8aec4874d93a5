//! # Prism
//!
//! **Unified GraphQL gateway serving core**
//!
//! Prism turns an executable schema into a running gateway process. A
//! single configured listener serves:
//!
//! - GraphQL operations over HTTP POST, with multipart upload adaptation
//! - GraphQL subscriptions over a WebSocket upgrade on the same path
//! - Webhook paths bridged onto an in-process pub/sub bus
//! - Dynamically registered request handlers, static assets, and a schema
//!   explorer page
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use prism::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config: ServeConfig = serde_json::from_str(&std::fs::read_to_string("serve.json")?)?;
//!     prism::init_logging(config.environment);
//!
//!     prism::serve(
//!         config,
//!         Arc::new(my_executor()),
//!         Arc::new(my_context_builder()),
//!         HandlerRegistry::new(),
//!     )
//!     .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Process model
//!
//! With `fork` disabled the calling process serves inline. With `fork`
//! enabled, [`serve`] becomes a supervisor that re-executes the binary once
//! per worker; workers share the port through `SO_REUSEPORT` and the
//! supervisor waits for them.

use std::sync::Arc;

// Re-export core types
pub use prism_core as core;

// Re-export the pub/sub bus
pub use prism_pubsub as pubsub;

// Re-export configuration types
pub use prism_config as config;

// Re-export the subscription transport
pub use prism_ws as ws;

// Re-export the serving core
pub use prism_server as server;

use prism_config::{Environment, ServeConfig};
use prism_core::{ContextBuilder, SchemaExecutor};
use prism_server::supervisor;
use prism_server::{GatewayServer, HandlerRegistry, StartupError};
use tracing_subscriber::EnvFilter;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust,ignore
/// use prism::prelude::*;
/// ```
pub mod prelude {
    pub use prism_config::{Environment, ForkMode, ServeConfig};
    pub use prism_core::{
        ContextBuilder, ContextRequest, ContextState, ExecutionContext, GraphQLError,
        GraphQLRequest, GraphQLResponse, SchemaExecutor, SubscriptionStream, Transport,
    };
    pub use prism_pubsub::{EventStream, MemoryPubSub, PubSub, PubSubHandle};
    pub use prism_server::{
        GatewayServer, HandlerRegistry, HandlerRequest, HandlerResponse, ShutdownSignal,
        StartupError,
    };
}

/// Initialize the global tracing subscriber.
///
/// Production emits JSON lines; any other environment gets the compact
/// human-readable format. The level defaults to `info` and honors
/// `RUST_LOG` overrides. Calling this twice is a caller error and panics,
/// matching the global subscriber contract.
pub fn init_logging(environment: Environment) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match environment {
        Environment::Production => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .init();
        }
        Environment::Development => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
}

/// Serve the given schema with the given configuration.
///
/// Resolves the process role first: a supervising process spawns workers
/// and waits, while workers and inline processes build a
/// [`GatewayServer`] and run it until an OS shutdown signal arrives.
///
/// # Errors
///
/// Returns a [`StartupError`] when handler resolution, binding, TLS setup,
/// or worker spawning fails. Startup errors are fatal; nothing is served.
pub async fn serve(
    config: ServeConfig,
    executor: Arc<dyn SchemaExecutor>,
    context_builder: Arc<dyn ContextBuilder>,
    handlers: HandlerRegistry,
) -> Result<(), StartupError> {
    if supervisor::should_supervise(&config) {
        return supervisor::run(&config).await;
    }

    GatewayServer::builder(config, executor, context_builder)
        .handlers(handlers)
        .build()?
        .run()
        .await
}
