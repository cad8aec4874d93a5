//! Server error taxonomy.
//!
//! Failures fall into exactly one of three surfaced forms: a fatal
//! [`StartupError`] before serving begins, a per-request 4xx
//! [`RequestError`] before execution, or an entry in the GraphQL response
//! error list. No failure in one request may affect an unrelated one.

use std::net::SocketAddr;
use std::path::PathBuf;

use bytes::Bytes;
use http::{Response, StatusCode};
use http_body_util::Full;
use thiserror::Error;

/// Fatal errors that prevent a worker from serving at all.
///
/// Every variant is logged with its cause and aborts startup; the server
/// never enters a partial serving state.
#[derive(Debug, Error)]
pub enum StartupError {
    /// The listen address could not be resolved from configuration.
    #[error(transparent)]
    Config(#[from] prism_config::ConfigError),

    /// The listener could not bind.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The address that was being bound.
        addr: SocketAddr,
        /// The underlying bind failure.
        #[source]
        source: std::io::Error,
    },

    /// TLS credential files were missing or unreadable.
    #[error("failed to read TLS credentials from {path}: {source}")]
    TlsRead {
        /// The credential file that failed.
        path: PathBuf,
        /// The underlying read failure.
        #[source]
        source: std::io::Error,
    },

    /// TLS credential material did not parse into a usable key/cert pair.
    #[error("invalid TLS credentials: {0}")]
    TlsMaterial(String),

    /// Configured handler references that no registered handler satisfies.
    #[error("unresolved handler references: {}", names.join(", "))]
    UnresolvedHandlers {
        /// The configured names with no registered handler.
        names: Vec<String>,
    },

    /// A configured handler entry declared an unusable HTTP method.
    #[error("handler at '{path}' declares invalid HTTP method '{method}'")]
    InvalidHandlerMethod {
        /// The entry's mount path.
        path: String,
        /// The method string as configured.
        method: String,
    },

    /// Spawning a worker process failed.
    #[error("failed to spawn worker process: {0}")]
    WorkerSpawn(#[source] std::io::Error),
}

/// Transport-level request failures, surfaced as 4xx before execution.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The request body could not be read from the connection.
    #[error("failed to read request body: {0}")]
    BodyRead(String),

    /// The request body exceeded the configured size limit.
    #[error("request body exceeds the {limit}-byte limit")]
    BodyTooLarge {
        /// The configured limit in bytes.
        limit: usize,
    },

    /// The body was not a valid GraphQL request document.
    #[error("malformed request body: {0}")]
    InvalidBody(String),

    /// A multipart request was structurally invalid.
    #[error("malformed multipart request: {0}")]
    InvalidMultipart(String),

    /// A multipart request carried more file parts than allowed.
    #[error("too many uploaded files (limit {limit})")]
    TooManyFiles {
        /// The configured file-count limit.
        limit: usize,
    },

    /// A single file part exceeded the per-file size limit.
    #[error("uploaded file '{name}' exceeds the {limit}-byte limit")]
    FileTooLarge {
        /// The offending file part name.
        name: String,
        /// The configured per-file limit in bytes.
        limit: usize,
    },
}

impl RequestError {
    /// The HTTP status this failure maps to.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BodyRead(_) | Self::InvalidBody(_) | Self::InvalidMultipart(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::BodyTooLarge { .. } | Self::TooManyFiles { .. } | Self::FileTooLarge { .. } => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
        }
    }

    /// Render the failure as a JSON error response.
    #[must_use]
    pub fn into_response(self) -> Response<Full<Bytes>> {
        let body = serde_json::json!({
            "errors": [{"message": self.to_string()}]
        });

        Response::builder()
            .status(self.status_code())
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(body.to_string())))
            .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
    }
}
