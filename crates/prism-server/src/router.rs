//! Configured handler mounts.
//!
//! The mount table is established once at startup from the configured
//! handler list, in configuration order; the first matching mount wins.
//! Dynamic entries resolve their handler reference while the table is
//! built, so an unregistered name aborts startup instead of leaving a
//! reserved route unserved.

use std::sync::Arc;

use http::Method;
use tracing::info;

use prism_config::HandlerEntry;

use crate::error::StartupError;
use crate::handlers::{HandlerRegistry, NamedHandler};

/// A resolved handler mount.
pub enum Mount {
    /// A webhook path bridged onto a bus topic; accepts any method.
    Webhook {
        /// Mount path.
        path: String,
        /// Topic published per inbound request.
        topic: String,
        /// Optional dot-path into the body.
        payload_path: Option<String>,
    },
    /// A named handler bound at startup.
    Dynamic {
        /// Mount path.
        path: String,
        /// Declared method; `None` mounts for all methods.
        method: Option<Method>,
        /// The configured handler name, kept for logging.
        name: String,
        /// The resolved handler.
        handler: Arc<dyn NamedHandler>,
    },
}

impl Mount {
    fn matches(&self, method: &Method, path: &str) -> bool {
        match self {
            Self::Webhook { path: mount, .. } => mount == path,
            Self::Dynamic {
                path: mount,
                method: declared,
                ..
            } => mount == path && declared.as_ref().map_or(true, |m| m == method),
        }
    }
}

impl std::fmt::Debug for Mount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Webhook { path, topic, .. } => f
                .debug_struct("Webhook")
                .field("path", path)
                .field("topic", topic)
                .finish_non_exhaustive(),
            Self::Dynamic {
                path, method, name, ..
            } => f
                .debug_struct("Dynamic")
                .field("path", path)
                .field("method", method)
                .field("name", name)
                .finish_non_exhaustive(),
        }
    }
}

/// The ordered mount table for configured handlers.
#[derive(Debug, Default)]
pub struct Router {
    mounts: Vec<Mount>,
}

impl Router {
    /// Build the table, resolving every dynamic reference.
    ///
    /// # Errors
    ///
    /// Returns [`StartupError::UnresolvedHandlers`] listing every
    /// configured name with no registered handler, or
    /// [`StartupError::InvalidHandlerMethod`] for an unusable method
    /// string.
    pub fn build(
        entries: &[HandlerEntry],
        registry: &HandlerRegistry,
    ) -> Result<Self, StartupError> {
        let missing: Vec<String> = entries
            .iter()
            .filter_map(|entry| match entry {
                HandlerEntry::Dynamic(dynamic) if !registry.contains(&dynamic.handler) => {
                    Some(dynamic.handler.clone())
                }
                _ => None,
            })
            .collect();
        if !missing.is_empty() {
            return Err(StartupError::UnresolvedHandlers { names: missing });
        }

        let mut mounts = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry {
                HandlerEntry::Webhook(webhook) => {
                    info!(path = %webhook.path, topic = %webhook.pubsub_topic, "mounting webhook bridge");
                    mounts.push(Mount::Webhook {
                        path: webhook.path.clone(),
                        topic: webhook.pubsub_topic.clone(),
                        payload_path: webhook.payload.clone(),
                    });
                }
                HandlerEntry::Dynamic(dynamic) => {
                    let method = dynamic
                        .method
                        .as_deref()
                        .map(parse_method)
                        .transpose()
                        .map_err(|method| StartupError::InvalidHandlerMethod {
                            path: dynamic.path.clone(),
                            method,
                        })?;
                    // Resolution checked above; the entry cannot be absent.
                    let handler = registry.resolve(&dynamic.handler).ok_or_else(|| {
                        StartupError::UnresolvedHandlers {
                            names: vec![dynamic.handler.clone()],
                        }
                    })?;
                    info!(path = %dynamic.path, handler = %dynamic.handler, "mounting dynamic handler");
                    mounts.push(Mount::Dynamic {
                        path: dynamic.path.clone(),
                        method,
                        name: dynamic.handler.clone(),
                        handler,
                    });
                }
            }
        }

        Ok(Self { mounts })
    }

    /// First mount matching the request, in configuration order.
    #[must_use]
    pub fn match_mount(&self, method: &Method, path: &str) -> Option<&Mount> {
        self.mounts.iter().find(|mount| mount.matches(method, path))
    }

    /// Number of mounts in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mounts.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }
}

/// Parse a configured method string, case-insensitively.
fn parse_method(raw: &str) -> Result<Method, String> {
    Method::from_bytes(raw.to_ascii_uppercase().as_bytes()).map_err(|_| raw.to_string())
}
