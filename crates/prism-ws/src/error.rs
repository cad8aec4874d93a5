//! Subscription transport errors and protocol close codes.

use thiserror::Error;

/// Result type alias using [`WsError`].
pub type WsResult<T> = Result<T, WsError>;

/// Errors raised by the subscription transport.
///
/// These are connection-scoped: a failure while producing values for one
/// operation never surfaces here, it becomes a tagged `error` frame for
/// that operation id only.
#[derive(Debug, Error)]
pub enum WsError {
    /// The request is not a valid WebSocket upgrade.
    #[error("not a websocket upgrade request: {0}")]
    NotUpgrade(String),

    /// The client did not complete the protocol handshake in time.
    #[error("connection initialisation timed out")]
    InitTimeout,

    /// The client sent a frame the protocol does not allow.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// A frame could not be decoded.
    #[error("failed to decode frame: {0}")]
    Decode(String),

    /// A frame could not be encoded.
    #[error("failed to encode frame: {0}")]
    Encode(String),

    /// The underlying socket failed.
    #[error("websocket transport error: {0}")]
    Transport(#[from] tungstenite::Error),
}

/// Application close codes used by the subscription protocol.
pub mod close_code {
    /// The client sent an invalid or undecodable frame.
    pub const INVALID_MESSAGE: u16 = 4400;
    /// Context construction rejected the connection.
    pub const FORBIDDEN: u16 = 4403;
    /// No `connection_init` arrived within the handshake timeout.
    pub const INIT_TIMEOUT: u16 = 4408;
    /// A `subscribe` reused an operation id that is still live.
    pub const SUBSCRIBER_EXISTS: u16 = 4409;
    /// More than one `connection_init` on the same connection.
    pub const TOO_MANY_INIT: u16 = 4429;
}
