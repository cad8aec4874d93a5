//! Configuration schema types.
//!
//! This module defines the structure of the serve configuration. Every
//! field has a serde default so a minimal `{}` document yields a working
//! development setup.

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Immutable startup configuration for the gateway.
///
/// Created once at process start; never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ServeConfig {
    /// Worker fan-out: absent/`false`/`0` serves inline, `true` spawns one
    /// worker per CPU core, `n > 1` spawns exactly `n` workers. `1` also
    /// serves inline (the current process is the one worker).
    #[serde(default)]
    pub fork: ForkMode,

    /// Hostname to bind and to advertise in the serve URL.
    #[serde(default = "default_hostname")]
    pub hostname: String,

    /// TCP port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path serving HTTP POST operations, the WS upgrade, and the explorer.
    #[serde(default = "default_graphql_path")]
    pub graphql_path: String,

    /// CORS policy, applied globally before any routing decision.
    #[serde(default)]
    pub cors: Option<CorsPolicy>,

    /// Extra handler mounts, in mount order (first match wins).
    #[serde(default)]
    pub handlers: Vec<HandlerEntry>,

    /// Root directory for static asset serving.
    #[serde(default)]
    pub static_dir: Option<PathBuf>,

    /// Explicit explorer enablement. Unset means "enabled unless the
    /// resolved environment is production".
    #[serde(default)]
    pub playground: Option<bool>,

    /// Runtime environment, resolved once at startup.
    ///
    /// The serde default reads `PRISM_ENV` once at deserialization; it is
    /// never consulted again on the request path.
    #[serde(default = "Environment::detect")]
    pub environment: Environment,

    /// Limits for the multipart upload adapter.
    #[serde(default)]
    pub upload_limits: UploadLimits,

    /// Maximum accepted request body size in bytes (non-multipart bodies).
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,

    /// TLS credential file paths. Present means serve TLS.
    #[serde(default)]
    pub tls: Option<TlsPaths>,

    /// Directory of example `.graphql` documents loaded into the explorer
    /// at startup. Not on the request path.
    #[serde(default)]
    pub documents_dir: Option<PathBuf>,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            fork: ForkMode::default(),
            hostname: default_hostname(),
            port: default_port(),
            graphql_path: default_graphql_path(),
            cors: None,
            handlers: Vec::new(),
            static_dir: None,
            playground: None,
            environment: Environment::detect(),
            upload_limits: UploadLimits::default(),
            max_body_size: default_max_body_size(),
            tls: None,
            documents_dir: None,
        }
    }
}

impl ServeConfig {
    /// Whether the explorer page should be mounted.
    ///
    /// Default resolution rule: enabled unless the environment resolved to
    /// production at startup; an explicit `playground` flag wins either way.
    #[must_use]
    pub fn playground_enabled(&self) -> bool {
        self.playground
            .unwrap_or(self.environment != Environment::Production)
    }

    /// Whether TLS credentials are configured.
    #[must_use]
    pub fn tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    /// Resolve the configured hostname/port into a bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::AddressResolution`] when the pair does not
    /// resolve.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        (self.hostname.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|source| ConfigError::AddressResolution {
                hostname: self.hostname.clone(),
                port: self.port,
                source,
            })?
            .next()
            .ok_or_else(|| ConfigError::AddressResolution {
                hostname: self.hostname.clone(),
                port: self.port,
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "resolved to no addresses",
                ),
            })
    }

    /// The URL logged at startup.
    #[must_use]
    pub fn serve_url(&self) -> String {
        let scheme = if self.tls_enabled() { "https" } else { "http" };
        format!(
            "{}://{}:{}{}",
            scheme, self.hostname, self.port, self.graphql_path
        )
    }
}

fn default_hostname() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    4000
}

fn default_graphql_path() -> String {
    "/graphql".to_string()
}

fn default_max_body_size() -> usize {
    1024 * 1024
}

/// Worker fan-out mode.
///
/// Deserializes from either a boolean (`true` = one worker per CPU core)
/// or a count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "ForkRepr", into = "ForkRepr")]
pub enum ForkMode {
    /// No fan-out; the current process serves.
    #[default]
    Disabled,
    /// One worker per available CPU core.
    Auto,
    /// An explicit worker count.
    Count(u32),
}

impl ForkMode {
    /// Number of worker processes the supervisor should spawn.
    ///
    /// `0` means serve inline: fan-out disabled, count zero, or count one
    /// (the current process is the one worker).
    #[must_use]
    pub fn spawn_count(&self) -> u32 {
        match self {
            Self::Disabled => 0,
            Self::Auto => {
                u32::try_from(
                    std::thread::available_parallelism()
                        .map(std::num::NonZeroUsize::get)
                        .unwrap_or(1),
                )
                .unwrap_or(1)
            }
            Self::Count(n) if *n > 1 => *n,
            Self::Count(_) => 0,
        }
    }
}

/// Serde representation of [`ForkMode`]: a bool or a number.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ForkRepr {
    Flag(bool),
    Count(u32),
}

impl From<ForkRepr> for ForkMode {
    fn from(repr: ForkRepr) -> Self {
        match repr {
            ForkRepr::Flag(true) => Self::Auto,
            ForkRepr::Flag(false) | ForkRepr::Count(0) => Self::Disabled,
            ForkRepr::Count(n) => Self::Count(n),
        }
    }
}

impl From<ForkMode> for ForkRepr {
    fn from(mode: ForkMode) -> Self {
        match mode {
            ForkMode::Disabled => Self::Flag(false),
            ForkMode::Auto => Self::Flag(true),
            ForkMode::Count(n) => Self::Count(n),
        }
    }
}

/// Runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development.
    Development,
    /// Production deployment.
    Production,
}

impl Environment {
    /// Resolve the environment from `PRISM_ENV`, once, at startup.
    #[must_use]
    pub fn detect() -> Self {
        match std::env::var("PRISM_ENV") {
            Ok(value) if value.eq_ignore_ascii_case("production") => Self::Production,
            _ => Self::Development,
        }
    }
}

/// An extra handler mount.
///
/// Tagged by shape: webhook entries carry `pubsubTopic`, dynamic entries
/// carry `handler`. Paths need not be unique; mounting order is the
/// configuration order and the first match wins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum HandlerEntry {
    /// A webhook-to-bus bridge.
    Webhook(WebhookEntry),
    /// A named handler resolved from the registry at startup.
    Dynamic(DynamicEntry),
}

impl HandlerEntry {
    /// The mount path shared by both variants.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Webhook(entry) => &entry.path,
            Self::Dynamic(entry) => &entry.path,
        }
    }
}

/// A webhook path bridged onto a pub/sub topic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WebhookEntry {
    /// Mount path; accepts any HTTP method.
    pub path: String,
    /// Topic published for each inbound request.
    pub pubsub_topic: String,
    /// Optional dot-path applied to the body before publishing. A missing
    /// field resolves to a null payload, not an error.
    #[serde(default)]
    pub payload: Option<String>,
}

/// A dynamically mounted request handler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DynamicEntry {
    /// Mount path.
    pub path: String,
    /// HTTP method, case-insensitive. Absent mounts for all methods.
    #[serde(default)]
    pub method: Option<String>,
    /// Registry name resolved to a handler function at startup.
    /// Resolution failure is fatal.
    pub handler: String,
}

/// CORS policy consumed by the globally applied CORS middleware.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CorsPolicy {
    /// Allowed origins; `*` allows any.
    #[serde(default = "default_origins")]
    pub origins: Vec<String>,
    /// Allowed methods for preflight responses.
    #[serde(default = "default_methods")]
    pub methods: Vec<String>,
    /// Allowed request headers for preflight responses.
    #[serde(default)]
    pub allowed_headers: Vec<String>,
    /// Headers exposed to browser scripts.
    #[serde(default)]
    pub exposed_headers: Vec<String>,
    /// Whether to allow credentialed requests.
    #[serde(default)]
    pub credentials: bool,
    /// Preflight cache lifetime in seconds.
    #[serde(default)]
    pub max_age: Option<u64>,
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self {
            origins: default_origins(),
            methods: default_methods(),
            allowed_headers: Vec::new(),
            exposed_headers: Vec::new(),
            credentials: false,
            max_age: None,
        }
    }
}

fn default_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_methods() -> Vec<String> {
    vec!["GET".to_string(), "POST".to_string(), "OPTIONS".to_string()]
}

/// Upload adapter limits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UploadLimits {
    /// Maximum size per file part in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,
    /// Maximum number of file parts per request.
    #[serde(default = "default_max_files")]
    pub max_files: usize,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            max_files: default_max_files(),
        }
    }
}

fn default_max_file_size() -> usize {
    10 * 1024 * 1024
}

fn default_max_files() -> usize {
    10
}

/// TLS credential file paths.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TlsPaths {
    /// PEM private key path.
    pub key: PathBuf,
    /// PEM certificate chain path.
    pub cert: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_minimal_config_defaults() {
        let config: ServeConfig = serde_json::from_value(json!({})).unwrap();
        assert_eq!(config.port, 4000);
        assert_eq!(config.hostname, "127.0.0.1");
        assert_eq!(config.graphql_path, "/graphql");
        assert_eq!(config.fork, ForkMode::Disabled);
        assert!(config.handlers.is_empty());
        assert!(!config.tls_enabled());
    }

    #[test]
    fn test_fork_from_bool_and_number() {
        let auto: ServeConfig = serde_json::from_value(json!({"fork": true})).unwrap();
        assert_eq!(auto.fork, ForkMode::Auto);
        assert!(auto.fork.spawn_count() >= 1);

        let disabled: ServeConfig = serde_json::from_value(json!({"fork": false})).unwrap();
        assert_eq!(disabled.fork.spawn_count(), 0);

        let four: ServeConfig = serde_json::from_value(json!({"fork": 4})).unwrap();
        assert_eq!(four.fork, ForkMode::Count(4));
        assert_eq!(four.fork.spawn_count(), 4);
    }

    #[test]
    fn test_fork_one_serves_inline() {
        let one: ServeConfig = serde_json::from_value(json!({"fork": 1})).unwrap();
        assert_eq!(one.fork.spawn_count(), 0);

        let zero: ServeConfig = serde_json::from_value(json!({"fork": 0})).unwrap();
        assert_eq!(zero.fork, ForkMode::Disabled);
    }

    #[test]
    fn test_handler_entry_discrimination() {
        let config: ServeConfig = serde_json::from_value(json!({
            "handlers": [
                {"path": "/webhooks/gh", "pubsubTopic": "gh", "payload": "event"},
                {"path": "/admin", "method": "GET", "handler": "adminPanel"},
                {"path": "/anything", "handler": "catchAll"}
            ]
        }))
        .unwrap();

        assert_eq!(config.handlers.len(), 3);
        match &config.handlers[0] {
            HandlerEntry::Webhook(entry) => {
                assert_eq!(entry.pubsub_topic, "gh");
                assert_eq!(entry.payload.as_deref(), Some("event"));
            }
            HandlerEntry::Dynamic(_) => panic!("first entry should be a webhook"),
        }
        match &config.handlers[1] {
            HandlerEntry::Dynamic(entry) => {
                assert_eq!(entry.method.as_deref(), Some("GET"));
                assert_eq!(entry.handler, "adminPanel");
            }
            HandlerEntry::Webhook(_) => panic!("second entry should be dynamic"),
        }
        assert_eq!(config.handlers[2].path(), "/anything");
    }

    #[test]
    fn test_playground_default_by_environment() {
        let mut config = ServeConfig {
            environment: Environment::Development,
            ..ServeConfig::default()
        };
        config.playground = None;
        assert!(config.playground_enabled());

        config.environment = Environment::Production;
        assert!(!config.playground_enabled());

        // Explicit flag wins over the environment default.
        config.playground = Some(true);
        assert!(config.playground_enabled());
    }

    #[test]
    fn test_serve_url_scheme_follows_tls() {
        let mut config = ServeConfig::default();
        assert_eq!(config.serve_url(), "http://127.0.0.1:4000/graphql");

        config.tls = Some(TlsPaths {
            key: "/etc/prism/key.pem".into(),
            cert: "/etc/prism/cert.pem".into(),
        });
        assert_eq!(config.serve_url(), "https://127.0.0.1:4000/graphql");
    }

    #[test]
    fn test_socket_addr_resolution() {
        let config = ServeConfig::default();
        let addr = config.socket_addr().unwrap();
        assert_eq!(addr.port(), 4000);
    }

    #[test]
    fn test_upload_limits_defaults() {
        let limits = UploadLimits::default();
        assert_eq!(limits.max_file_size, 10 * 1024 * 1024);
        assert_eq!(limits.max_files, 10);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<ServeConfig, _> =
            serde_json::from_value(json!({"prot": 4000}));
        assert!(result.is_err());
    }

    #[test]
    fn test_fork_roundtrip() {
        for mode in [ForkMode::Disabled, ForkMode::Auto, ForkMode::Count(8)] {
            let serialized = serde_json::to_value(mode).unwrap();
            let back: ForkMode = serde_json::from_value(serialized).unwrap();
            assert_eq!(back, mode);
        }
    }
}
