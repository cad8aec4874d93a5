//! Startup configuration for the Prism gateway.
//!
//! [`ServeConfig`] is created once at process start and never mutated. It
//! deserializes from JSON/YAML-shaped sources with camelCase keys and
//! sensible defaults, mirroring the configuration surface of the wider
//! gateway project.
//!
//! # Example
//!
//! ```
//! use prism_config::ServeConfig;
//!
//! let config: ServeConfig = serde_json::from_str(r#"{
//!     "port": 4000,
//!     "fork": 4,
//!     "handlers": [
//!         {"path": "/webhooks/github", "pubsubTopic": "github", "payload": "event"}
//!     ]
//! }"#).unwrap();
//!
//! assert_eq!(config.port, 4000);
//! assert_eq!(config.fork.spawn_count(), 4);
//! ```

mod error;
mod schema;

pub use error::ConfigError;
pub use schema::{
    CorsPolicy, DynamicEntry, Environment, ForkMode, HandlerEntry, ServeConfig, TlsPaths,
    UploadLimits, WebhookEntry,
};
