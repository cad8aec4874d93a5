//! Subscription protocol transport for the Prism gateway.
//!
//! The same base path that serves HTTP POST operations accepts a WebSocket
//! upgrade carrying a GraphQL subscription protocol. Each connection goes
//! through `Connecting → Connected → {Subscribing per operation} → Closed`:
//!
//! - On handshake, one [`ExecutionContext`](prism_core::ExecutionContext)
//!   is built from the upgrade request and lives for the whole connection.
//! - Each `subscribe` frame binds a [`SubscriptionSession`] to the async
//!   sequence returned by the executor's `subscribe`, forwarding values as
//!   tagged `next` frames in production order.
//! - `stop` cancels exactly one session; connection close cancels all.
//!
//! [`SubscriptionSession`]: session::SubscriptionSession

mod connection;
mod error;
pub mod protocol;
mod session;
pub mod upgrade;

pub use connection::{ConnectionConfig, SubscriptionConnection};
pub use error::{close_code, WsError, WsResult};
pub use protocol::{ClientMessage, ServerMessage};
pub use upgrade::{is_upgrade_request, prepare_upgrade, SUBPROTOCOL};
