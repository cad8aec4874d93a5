//! Configuration error types.

use thiserror::Error;

/// Errors raised while interpreting a [`ServeConfig`](crate::ServeConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configured hostname/port pair did not resolve to an address.
    #[error("cannot resolve listen address '{hostname}:{port}': {source}")]
    AddressResolution {
        /// Configured hostname.
        hostname: String,
        /// Configured port.
        port: u16,
        /// The underlying resolution failure.
        #[source]
        source: std::io::Error,
    },
}
