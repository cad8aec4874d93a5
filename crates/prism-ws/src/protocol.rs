//! Subscription protocol frames.
//!
//! JSON text frames tagged by `type`, keyed by a client-chosen operation
//! id. The client drives with `connection_init`, `subscribe`, and `stop`;
//! the server answers with `connection_ack`, `next`, `error`, and
//! `complete`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use prism_core::{GraphQLError, GraphQLRequest, GraphQLResponse};

/// Frames sent by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Opens the protocol handshake; must be the first frame.
    ConnectionInit {
        /// Optional connection parameters.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },
    /// Starts a subscription operation under a client-chosen id.
    Subscribe {
        /// Operation id, unique among this connection's live operations.
        id: String,
        /// The subscription operation to run.
        payload: GraphQLRequest,
    },
    /// Cancels one operation without closing the connection.
    Stop {
        /// Operation id to cancel.
        id: String,
    },
    /// Keep-alive probe; answered with a `pong` frame.
    Ping {
        /// Optional probe payload, echoed back.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },
    /// Keep-alive answer; ignored by the server.
    Pong {
        /// Optional probe payload.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },
}

/// Frames sent by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Acknowledges `connection_init`; the connection context is built.
    ConnectionAck,
    /// One value produced by an operation's source sequence.
    Next {
        /// Operation id the value belongs to.
        id: String,
        /// The execution result.
        payload: GraphQLResponse,
    },
    /// The operation's sequence failed; this ends the operation only.
    Error {
        /// Operation id the failure belongs to.
        id: String,
        /// The failure, as a GraphQL error list.
        payload: Vec<GraphQLError>,
    },
    /// The operation's sequence finished normally.
    Complete {
        /// Operation id that completed.
        id: String,
    },
    /// Answer to a client `ping`.
    Pong {
        /// Echoed probe payload.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },
}

impl ServerMessage {
    /// Serialize the frame to its JSON text representation.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
