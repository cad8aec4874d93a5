//! Per-connection subscription protocol state machine.
//!
//! One [`SubscriptionConnection`] drives a connection through
//! `Connecting → Connected → {Subscribing per operation} → Closed`. All
//! outbound frames funnel through a single writer task, so values for one
//! operation reach the socket in the order its sequence produced them.

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, warn};
use tungstenite::protocol::frame::coding::CloseCode;
use tungstenite::protocol::CloseFrame;
use tungstenite::Message;

use prism_core::{
    ContextBuilder, ContextRequest, ExecutionContext, RequestId, SchemaExecutor,
};
use prism_pubsub::PubSubHandle;

use crate::error::{close_code, WsError, WsResult};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::session::{SessionMap, SubscriptionSession};

/// Per-connection protocol settings.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// How long to wait for the client's `connection_init` frame.
    pub init_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            init_timeout: Duration::from_secs(5),
        }
    }
}

/// The subscription gateway for one WebSocket connection.
///
/// Owns the shared executor, context builder, and bus handle; [`run`]
/// consumes an upgraded socket and serves it until the client goes away.
///
/// [`run`]: SubscriptionConnection::run
pub struct SubscriptionConnection {
    executor: Arc<dyn SchemaExecutor>,
    context_builder: Arc<dyn ContextBuilder>,
    bus: PubSubHandle,
    config: ConnectionConfig,
}

impl SubscriptionConnection {
    /// Create a connection handler over the worker's shared capabilities.
    #[must_use]
    pub fn new(
        executor: Arc<dyn SchemaExecutor>,
        context_builder: Arc<dyn ContextBuilder>,
        bus: PubSubHandle,
    ) -> Self {
        Self {
            executor,
            context_builder,
            bus,
            config: ConnectionConfig::default(),
        }
    }

    /// Override the protocol settings.
    #[must_use]
    pub fn with_config(mut self, config: ConnectionConfig) -> Self {
        self.config = config;
        self
    }

    /// Serve an upgraded socket until the connection closes.
    ///
    /// `upgrade_request` is the raw view of the HTTP upgrade request; the
    /// connection context is built from it exactly once, after the
    /// protocol handshake, and shared by every operation on this
    /// connection.
    pub async fn run<S>(&self, ws: WebSocketStream<S>, upgrade_request: ContextRequest)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let connection_id = RequestId::new();
        let (sink, mut inbound) = ws.split();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let writer = tokio::spawn(write_loop(sink, out_rx));
        let sessions = SessionMap::new();

        if let Err(error) = self
            .serve(connection_id, &mut inbound, &out_tx, &sessions, upgrade_request)
            .await
        {
            debug!(%connection_id, %error, "subscription connection ended with error");
        }

        // No dangling subscriptions beyond the connection's lifetime.
        sessions.cancel_all();
        drop(out_tx);
        let _ = writer.await;
        debug!(%connection_id, "subscription connection closed");
    }

    async fn serve<S>(
        &self,
        connection_id: RequestId,
        inbound: &mut SplitStream<WebSocketStream<S>>,
        out_tx: &mpsc::UnboundedSender<Message>,
        sessions: &SessionMap,
        upgrade_request: ContextRequest,
    ) -> WsResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let ctx = match self
            .handshake(inbound, out_tx, upgrade_request, connection_id)
            .await?
        {
            Some(ctx) => ctx,
            None => return Ok(()),
        };

        while let Some(frame) = next_frame(inbound, out_tx).await {
            match frame {
                Ok(ClientMessage::Subscribe { id, payload }) => {
                    if sessions.contains(&id) {
                        send_close(
                            out_tx,
                            close_code::SUBSCRIBER_EXISTS,
                            "subscriber already exists",
                        );
                        break;
                    }
                    self.start_session(id, payload, ctx.clone(), out_tx, sessions)
                        .await;
                }
                Ok(ClientMessage::Stop { id }) => {
                    if !sessions.cancel(&id) {
                        debug!(%connection_id, operation_id = %id, "stop for unknown operation");
                    }
                }
                Ok(ClientMessage::ConnectionInit { .. }) => {
                    send_close(
                        out_tx,
                        close_code::TOO_MANY_INIT,
                        "too many initialisation requests",
                    );
                    break;
                }
                Ok(ClientMessage::Ping { payload }) => {
                    send_frame(out_tx, &ServerMessage::Pong { payload });
                }
                Ok(ClientMessage::Pong { .. }) => {}
                Err(error @ (WsError::Decode(_) | WsError::Protocol(_))) => {
                    send_close(out_tx, close_code::INVALID_MESSAGE, "invalid message");
                    return Err(error);
                }
                Err(error) => return Err(error),
            }
        }

        Ok(())
    }

    /// Await `connection_init`, build the connection context, and ack.
    ///
    /// Returns `None` when the connection should close without serving
    /// (clean close during handshake, timeout, or a rejected context).
    async fn handshake<S>(
        &self,
        inbound: &mut SplitStream<WebSocketStream<S>>,
        out_tx: &mpsc::UnboundedSender<Message>,
        upgrade_request: ContextRequest,
        connection_id: RequestId,
    ) -> WsResult<Option<ExecutionContext>>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let first = tokio::time::timeout(
            self.config.init_timeout,
            next_frame(inbound, out_tx),
        )
        .await;

        let frame = match first {
            Ok(Some(frame)) => frame?,
            Ok(None) => return Ok(None),
            Err(_) => {
                send_close(
                    out_tx,
                    close_code::INIT_TIMEOUT,
                    "connection initialisation timeout",
                );
                return Err(WsError::InitTimeout);
            }
        };

        match frame {
            ClientMessage::ConnectionInit { .. } => {}
            other => {
                send_close(out_tx, close_code::INVALID_MESSAGE, "expected connection_init");
                return Err(WsError::Protocol(format!(
                    "expected connection_init, got {other:?}"
                )));
            }
        }

        // One context per connection, built from the upgrade request; it
        // is NOT rebuilt per subscribed operation.
        let state = match self.context_builder.build(upgrade_request).await {
            Ok(state) => state,
            Err(error) => {
                warn!(%connection_id, %error, "connection context rejected");
                send_close(out_tx, close_code::FORBIDDEN, "forbidden");
                return Ok(None);
            }
        };

        send_frame(out_tx, &ServerMessage::ConnectionAck);
        Ok(Some(ExecutionContext::new(
            connection_id,
            Arc::clone(&self.bus),
            state,
        )))
    }

    /// Bind one operation id to its source sequence.
    async fn start_session(
        &self,
        id: String,
        payload: prism_core::GraphQLRequest,
        ctx: ExecutionContext,
        out_tx: &mpsc::UnboundedSender<Message>,
        sessions: &SessionMap,
    ) {
        let mut stream = match self.executor.subscribe(payload, ctx).await {
            Ok(stream) => stream,
            Err(error) => {
                // Setup failure ends this operation only.
                send_frame(
                    out_tx,
                    &ServerMessage::Error {
                        id,
                        payload: vec![error],
                    },
                );
                return;
            }
        };

        // Gate the forwarding task on session registration so completion
        // cannot race the insert below.
        let (started_tx, started_rx) = oneshot::channel();
        let task_tx = out_tx.clone();
        let task_sessions = sessions.clone();
        let operation_id = id.clone();

        let task = tokio::spawn(async move {
            if started_rx.await.is_err() {
                return;
            }

            let mut errored = false;
            while let Some(item) = stream.next().await {
                match item {
                    Ok(response) => {
                        let frame = ServerMessage::Next {
                            id: operation_id.clone(),
                            payload: response,
                        };
                        if !send_frame(&task_tx, &frame) {
                            break;
                        }
                    }
                    Err(error) => {
                        // Delivered for this operation id only; siblings
                        // and the connection itself are unaffected.
                        send_frame(
                            &task_tx,
                            &ServerMessage::Error {
                                id: operation_id.clone(),
                                payload: vec![error],
                            },
                        );
                        errored = true;
                        break;
                    }
                }
            }

            if !errored {
                send_frame(
                    &task_tx,
                    &ServerMessage::Complete {
                        id: operation_id.clone(),
                    },
                );
            }
            task_sessions.forget(&operation_id);
        });

        sessions.insert(id, SubscriptionSession::new(task));
        let _ = started_tx.send(());
    }
}

/// Forward queued frames to the socket in order.
async fn write_loop<S>(
    mut sink: SplitSink<WebSocketStream<S>, Message>,
    mut out_rx: mpsc::UnboundedReceiver<Message>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    while let Some(message) = out_rx.recv().await {
        if sink.send(message).await.is_err() {
            break;
        }
    }
    let _ = sink.close().await;
}

/// Read the next protocol frame, transparently answering socket pings.
///
/// Returns `None` when the peer closed the connection.
async fn next_frame<S>(
    inbound: &mut SplitStream<WebSocketStream<S>>,
    out_tx: &mpsc::UnboundedSender<Message>,
) -> Option<WsResult<ClientMessage>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    while let Some(item) = inbound.next().await {
        match item {
            Ok(Message::Text(text)) => {
                return Some(
                    serde_json::from_str(&text).map_err(|e| WsError::Decode(e.to_string())),
                );
            }
            Ok(Message::Ping(data)) => {
                let _ = out_tx.send(Message::Pong(data));
            }
            Ok(Message::Pong(_) | Message::Frame(_)) => {}
            Ok(Message::Binary(_)) => {
                return Some(Err(WsError::Protocol(
                    "binary frames are not part of the protocol".to_string(),
                )));
            }
            Ok(Message::Close(_)) => return None,
            Err(error) => return Some(Err(WsError::Transport(error))),
        }
    }
    None
}

/// Queue a protocol frame; returns whether the connection still accepts
/// writes.
fn send_frame(out_tx: &mpsc::UnboundedSender<Message>, frame: &ServerMessage) -> bool {
    match frame.to_json() {
        Ok(json) => out_tx.send(Message::text(json)).is_ok(),
        Err(error) => {
            warn!(%error, "failed to encode protocol frame");
            false
        }
    }
}

/// Queue a close frame with an application close code.
fn send_close(out_tx: &mpsc::UnboundedSender<Message>, code: u16, reason: &'static str) {
    let _ = out_tx.send(Message::Close(Some(CloseFrame {
        code: CloseCode::from(code),
        reason: reason.into(),
    })));
}
