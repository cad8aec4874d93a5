//! The unified HTTP and WebSocket gateway server.
//!
//! One listener serves every surface. Routing order is fixed at startup:
//! CORS preflight handling, static assets (with `GET /` resolving to the
//! index document), the GraphQL path (POST operations and the WebSocket
//! upgrade), configured handler mounts in configuration order, then the
//! explorer page. First match wins where paths collide.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::{header, Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full, Limited};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::protocol::Role;
use tokio_tungstenite::WebSocketStream;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info, warn};

use prism_config::ServeConfig;
use prism_core::{ContextBuilder, ContextRequest, SchemaExecutor, Transport};
use prism_pubsub::{MemoryPubSub, PubSubHandle};
use prism_ws::{is_upgrade_request, prepare_upgrade, SubscriptionConnection};

use crate::cors::Cors;
use crate::error::{RequestError, StartupError};
use crate::gateway::ExecutionGateway;
use crate::handlers::{HandlerRegistry, HandlerRequest};
use crate::listener;
use crate::playground::{self, Playground};
use crate::router::{Mount, Router};
use crate::shutdown::{ConnectionTracker, ShutdownSignal};
use crate::static_files::StaticFiles;
use crate::tls;
use crate::{bridge, upload};

/// The HTTP response body used throughout the gateway.
pub type ResponseBody = Full<Bytes>;

/// The HTTP response type used throughout the gateway.
pub type HttpResponse = Response<ResponseBody>;

const SHUTDOWN_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// The gateway server for one worker process.
pub struct GatewayServer {
    config: ServeConfig,
    router: Router,
    cors: Option<Cors>,
    static_files: Option<StaticFiles>,
    playground: Option<Playground>,
    bus: PubSubHandle,
    gateway: ExecutionGateway,
    subscriptions: Arc<SubscriptionConnection>,
}

impl GatewayServer {
    /// Start building a server.
    #[must_use]
    pub fn builder(
        config: ServeConfig,
        executor: Arc<dyn SchemaExecutor>,
        context_builder: Arc<dyn ContextBuilder>,
    ) -> GatewayServerBuilder {
        GatewayServerBuilder {
            config,
            executor,
            context_builder,
            registry: HandlerRegistry::new(),
            bus: None,
        }
    }

    /// The bus this worker publishes and subscribes on.
    #[must_use]
    pub fn bus(&self) -> &PubSubHandle {
        &self.bus
    }

    /// Run until SIGTERM or SIGINT.
    ///
    /// # Errors
    ///
    /// Returns a [`StartupError`] when binding or TLS setup fails; the
    /// cause is logged before returning.
    pub async fn run(self) -> Result<(), StartupError> {
        let shutdown = ShutdownSignal::with_os_signals();
        self.run_with_shutdown(shutdown).await
    }

    /// Run with a caller-controlled shutdown signal.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), StartupError> {
        let startup = self.start(&shutdown);
        match startup {
            Ok(future) => future.await,
            Err(startup_error) => {
                error!(error = %startup_error, "gateway startup failed");
                Err(startup_error)
            }
        }
    }

    /// Bind and build the accept loop; failures here are fatal.
    fn start(
        self,
        shutdown: &ShutdownSignal,
    ) -> Result<impl std::future::Future<Output = Result<(), StartupError>>, StartupError> {
        let addr = self.config.socket_addr()?;
        // TLS material is validated before the port is taken.
        let tls_acceptor = match &self.config.tls {
            Some(paths) => Some(tls::build_acceptor(paths)?),
            None => None,
        };
        let listener = listener::bind(addr)?;

        info!(url = %self.config.serve_url(), "gateway listening");

        let shutdown = shutdown.clone();
        let server = Arc::new(self);
        Ok(async move {
            let tracker = ConnectionTracker::new();

            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, remote_addr)) => {
                                let server = Arc::clone(&server);
                                let token = tracker.acquire();
                                let shutdown = shutdown.clone();
                                let tls_acceptor = tls_acceptor.clone();

                                tokio::spawn(async move {
                                    server
                                        .accept_connection(stream, remote_addr, tls_acceptor, shutdown)
                                        .await;
                                    drop(token);
                                });
                            }
                            Err(error) => warn!(%error, "failed to accept connection"),
                        }
                    }
                    _ = shutdown.recv() => {
                        info!("shutdown signal received");
                        break;
                    }
                }
            }

            tokio::select! {
                _ = tracker.wait_for_drain() => debug!("all connections drained"),
                _ = tokio::time::sleep(SHUTDOWN_DRAIN_TIMEOUT) => {
                    warn!(
                        active = tracker.active_connections(),
                        "drain timeout reached with connections still active"
                    );
                }
            }

            Ok(())
        })
    }

    async fn accept_connection(
        self: Arc<Self>,
        stream: tokio::net::TcpStream,
        remote_addr: SocketAddr,
        tls_acceptor: Option<TlsAcceptor>,
        shutdown: ShutdownSignal,
    ) {
        match tls_acceptor {
            Some(acceptor) => match acceptor.accept(stream).await {
                Ok(tls_stream) => {
                    self.serve_connection(tls_stream, remote_addr, shutdown).await;
                }
                Err(error) => debug!(%remote_addr, %error, "TLS handshake failed"),
            },
            None => self.serve_connection(stream, remote_addr, shutdown).await,
        }
    }

    async fn serve_connection<S>(
        self: Arc<Self>,
        stream: S,
        remote_addr: SocketAddr,
        shutdown: ShutdownSignal,
    ) where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let io = TokioIo::new(stream);
        let server = Arc::clone(&self);

        let service = service_fn(move |req: Request<hyper::body::Incoming>| {
            let server = Arc::clone(&server);
            async move { Ok::<_, Infallible>(server.handle_request(req, Some(remote_addr)).await) }
        });

        let conn = http1::Builder::new()
            .serve_connection(io, service)
            .with_upgrades();

        tokio::select! {
            result = conn => {
                if let Err(error) = result {
                    debug!(%remote_addr, %error, "connection error");
                }
            }
            _ = shutdown.recv() => debug!(%remote_addr, "connection closed by shutdown"),
        }
    }

    /// Route one request through the mount order.
    async fn handle_request<B>(
        &self,
        mut req: Request<B>,
        remote_addr: Option<SocketAddr>,
    ) -> HttpResponse
    where
        B: hyper::body::Body + Send + 'static,
        B::Data: Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let method = req.method().clone();
        let uri = req.uri().clone();
        let path = uri.path().to_string();
        let request_headers = req.headers().clone();

        debug!(%method, %path, "routing request");

        // CORS runs before any routing decision.
        if let Some(cors) = &self.cors {
            if Cors::is_preflight(&req) {
                return cors.preflight_response(&req);
            }
        }

        // Static assets shadow everything mounted after them, including
        // the explorer at root.
        if let Some(files) = &self.static_files {
            if let Some(response) = files.try_serve(&method, &path).await {
                return self.finish(&request_headers, response);
            }
        }

        if path == self.config.graphql_path {
            if is_upgrade_request(&req) {
                return self.handle_upgrade(&mut req, remote_addr);
            }
            if method == Method::POST {
                let context_request = ContextRequest::new(
                    method,
                    uri,
                    request_headers.clone(),
                    remote_addr,
                    Transport::Http,
                );
                // Multipart bodies are governed by the upload limits alone;
                // `max_body_size` only bounds plain JSON operations.
                let limit = if is_multipart(&request_headers) {
                    upload::stream_budget(&self.config.upload_limits)
                } else {
                    self.config.max_body_size
                };
                let response = match self.collect_body(req, limit).await {
                    Ok(body) => self.gateway.handle(context_request, body).await,
                    Err(error) => return self.finish(&request_headers, error.into_response()),
                };
                return self.finish(&request_headers, response);
            }
        }

        if let Some(mount) = self.router.match_mount(&method, &path) {
            let response = self
                .handle_mount(mount, method, uri, request_headers.clone(), remote_addr, req)
                .await;
            return self.finish(&request_headers, response);
        }

        if let Some(playground) = &self.playground {
            let at_graphql_path = path == self.config.graphql_path;
            let at_root = path == "/" && self.static_files.is_none();
            if method == Method::GET && (at_graphql_path || at_root) {
                return self.finish(&request_headers, playground.response());
            }
        }

        self.finish(&request_headers, not_found(&path))
    }

    fn handle_upgrade<B>(
        &self,
        req: &mut Request<B>,
        remote_addr: Option<SocketAddr>,
    ) -> HttpResponse
    where
        B: Send + 'static,
    {
        let response = match prepare_upgrade(req) {
            Ok(response) => response,
            Err(error) => {
                debug!(%error, "invalid websocket handshake");
                return RequestError::InvalidBody(error.to_string()).into_response();
            }
        };

        let context_request = ContextRequest::new(
            req.method().clone(),
            req.uri().clone(),
            req.headers().clone(),
            remote_addr,
            Transport::WebSocket,
        );

        let upgrade = hyper::upgrade::on(req);
        let subscriptions = Arc::clone(&self.subscriptions);
        tokio::spawn(async move {
            match upgrade.await {
                Ok(upgraded) => {
                    let io = TokioIo::new(upgraded);
                    let ws = WebSocketStream::from_raw_socket(io, Role::Server, None).await;
                    subscriptions.run(ws, context_request).await;
                }
                Err(error) => debug!(%error, "websocket upgrade failed"),
            }
        });

        response
    }

    async fn handle_mount<B>(
        &self,
        mount: &Mount,
        method: Method,
        uri: http::Uri,
        headers: http::HeaderMap,
        remote_addr: Option<SocketAddr>,
        req: Request<B>,
    ) -> HttpResponse
    where
        B: hyper::body::Body + Send + 'static,
        B::Data: Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let body = match self.collect_body(req, self.config.max_body_size).await {
            Ok(body) => body,
            Err(error) => return error.into_response(),
        };

        match mount {
            Mount::Webhook {
                topic,
                payload_path,
                ..
            } => bridge::handle_webhook(&self.bus, topic, payload_path.as_deref(), &body),
            Mount::Dynamic { handler, name, .. } => {
                debug!(handler = %name, "invoking dynamic handler");
                let response = handler
                    .handle(HandlerRequest {
                        method,
                        uri,
                        headers,
                        body,
                        remote_addr,
                        bus: Arc::clone(&self.bus),
                    })
                    .await;

                Response::builder()
                    .status(response.status)
                    .header(header::CONTENT_TYPE, response.content_type)
                    .body(Full::new(response.body))
                    .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
            }
        }
    }

    /// Collect a body, bounded by the given byte limit.
    async fn collect_body<B>(&self, req: Request<B>, limit: usize) -> Result<Bytes, RequestError>
    where
        B: hyper::body::Body + Send + 'static,
        B::Data: Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let limited = Limited::new(req.into_body(), limit);
        match limited.collect().await {
            Ok(collected) => Ok(collected.to_bytes()),
            Err(error) => {
                if error.is::<http_body_util::LengthLimitError>() {
                    Err(RequestError::BodyTooLarge { limit })
                } else {
                    Err(RequestError::BodyRead(error.to_string()))
                }
            }
        }
    }

    /// Append globally applied response headers on the way out.
    fn finish(&self, request_headers: &http::HeaderMap, mut response: HttpResponse) -> HttpResponse {
        if let Some(cors) = &self.cors {
            cors.apply(request_headers, &mut response);
        }
        response
    }
}

fn is_multipart(headers: &http::HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<mime::Mime>().ok())
        .is_some_and(|m| m.essence_str() == mime::MULTIPART_FORM_DATA.essence_str())
}

fn not_found(path: &str) -> HttpResponse {
    let body = serde_json::json!({
        "errors": [{"message": format!("no route for {path}")}]
    });
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}

/// Builder assembling a [`GatewayServer`] from its collaborators.
pub struct GatewayServerBuilder {
    config: ServeConfig,
    executor: Arc<dyn SchemaExecutor>,
    context_builder: Arc<dyn ContextBuilder>,
    registry: HandlerRegistry,
    bus: Option<PubSubHandle>,
}

impl GatewayServerBuilder {
    /// Provide the registry backing dynamic handler mounts.
    #[must_use]
    pub fn handlers(mut self, registry: HandlerRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Replace the in-process bus with a caller-supplied implementation.
    #[must_use]
    pub fn bus(mut self, bus: PubSubHandle) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Resolve mounts and assemble the server.
    ///
    /// # Errors
    ///
    /// Fails when a configured handler reference is unregistered or
    /// declares an unusable method; routes are resolved here, before any
    /// socket is bound.
    pub fn build(self) -> Result<GatewayServer, StartupError> {
        let router = Router::build(&self.config.handlers, &self.registry)?;
        let cors = self.config.cors.clone().map(Cors::new);
        let static_files = self.config.static_dir.clone().map(StaticFiles::new);

        let playground = self.config.playground_enabled().then(|| {
            let documents = self
                .config
                .documents_dir
                .as_deref()
                .map(playground::load_documents)
                .unwrap_or_default();
            Playground::new(&self.config.graphql_path, &documents)
        });

        let bus = self
            .bus
            .unwrap_or_else(|| Arc::new(MemoryPubSub::new()) as PubSubHandle);
        let gateway = ExecutionGateway::new(
            Arc::clone(&self.executor),
            Arc::clone(&self.context_builder),
            Arc::clone(&bus),
            self.config.upload_limits,
        );
        let subscriptions = Arc::new(SubscriptionConnection::new(
            self.executor,
            self.context_builder,
            Arc::clone(&bus),
        ));

        Ok(GatewayServer {
            config: self.config,
            router,
            cors,
            static_files,
            playground,
            bus,
            gateway,
            subscriptions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use prism_core::{
        BoxFuture, EmptyContextBuilder, ExecutionContext, GraphQLError, GraphQLRequest,
        GraphQLResponse, SubscriptionStream,
    };
    use serde_json::json;

    struct StaticExecutor;

    impl SchemaExecutor for StaticExecutor {
        fn execute(
            &self,
            _request: GraphQLRequest,
            _ctx: ExecutionContext,
        ) -> BoxFuture<'static, GraphQLResponse> {
            Box::pin(async { GraphQLResponse::from_data(json!({"hello": "world"})) })
        }

        fn subscribe(
            &self,
            _request: GraphQLRequest,
            ctx: ExecutionContext,
        ) -> BoxFuture<'static, Result<SubscriptionStream, GraphQLError>> {
            let events = ctx.bus().subscribe("events");
            Box::pin(async move {
                Ok(Box::pin(events.map(|v| Ok(GraphQLResponse::from_data(v))))
                    as SubscriptionStream)
            })
        }
    }

    fn build_server(config: ServeConfig) -> Arc<GatewayServer> {
        Arc::new(
            GatewayServer::builder(
                config,
                Arc::new(StaticExecutor),
                Arc::new(EmptyContextBuilder),
            )
            .build()
            .unwrap(),
        )
    }

    fn post_graphql(body: &str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(Method::POST)
            .uri("/graphql")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(body.to_string())))
            .unwrap()
    }

    fn get(path: &str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(Method::GET)
            .uri(path)
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    async fn body_json(response: HttpResponse) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_post_executes_operation() {
        let server = build_server(ServeConfig::default());
        let response = server
            .handle_request(post_graphql(r#"{"query":"{ hello }"}"#), None)
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["data"]["hello"], json!("world"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_400() {
        let server = build_server(ServeConfig::default());
        let response = server.handle_request(post_graphql("{{{{"), None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_oversized_body_is_413() {
        let config = ServeConfig {
            max_body_size: 8,
            ..ServeConfig::default()
        };
        let server = build_server(config);
        let response = server
            .handle_request(post_graphql(r#"{"query":"{ a(b: \"long\") }"}"#), None)
            .await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_upload_within_limits_ignores_body_size_cap() {
        // The JSON body cap is deliberately smaller than the upload; the
        // upload limits alone govern multipart acceptance.
        let config = ServeConfig {
            max_body_size: 256,
            upload_limits: prism_config::UploadLimits {
                max_file_size: 1024,
                max_files: 2,
            },
            ..ServeConfig::default()
        };
        let server = build_server(config);

        let boundary = "----prism-upload";
        let mut body = String::new();
        body.push_str(&format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"operations\"\r\n\r\n\
             {{\"query\":\"mutation($f: Upload!) {{ upload(file: $f) }}\",\"variables\":{{\"f\":null}}}}\r\n"
        ));
        body.push_str(&format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"map\"\r\n\r\n\
             {{\"0\":[\"variables.f\"]}}\r\n"
        ));
        body.push_str(&format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"0\"; filename=\"blob.bin\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        ));
        body.push_str(&"x".repeat(100));
        body.push_str(&format!("\r\n--{boundary}--\r\n"));

        let request = Request::builder()
            .method(Method::POST)
            .uri("/graphql")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Full::new(Bytes::from(body)))
            .unwrap();
        let response = server.handle_request(request, None).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["data"]["hello"], json!("world"));
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let server = build_server(ServeConfig::default());
        let response = server.handle_request(get("/nothing-here"), None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_webhook_mount_publishes_and_acks() {
        let config: ServeConfig = serde_json::from_value(json!({
            "handlers": [
                {"path": "/hooks/gh", "pubsubTopic": "gh", "payload": "event"}
            ]
        }))
        .unwrap();
        let server = build_server(config);
        let mut events = server.bus().subscribe("gh");

        let request = Request::builder()
            .method(Method::POST)
            .uri("/hooks/gh")
            .body(Full::new(Bytes::from(r#"{"event":{"id":42}}"#)))
            .unwrap();
        let response = server.handle_request(request, None).await;

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(events.next().await, Some(json!({"id": 42})));
    }

    #[tokio::test]
    async fn test_dynamic_handler_mount() {
        let config: ServeConfig = serde_json::from_value(json!({
            "handlers": [
                {"path": "/admin", "method": "GET", "handler": "adminPanel"}
            ]
        }))
        .unwrap();

        let mut registry = HandlerRegistry::new();
        registry.register("adminPanel", |request: HandlerRequest| async move {
            crate::handlers::HandlerResponse::json(
                StatusCode::OK,
                &json!({"admin": true, "path": request.uri.path()}),
            )
        });

        let server = Arc::new(
            GatewayServer::builder(
                config,
                Arc::new(StaticExecutor),
                Arc::new(EmptyContextBuilder),
            )
            .handlers(registry)
            .build()
            .unwrap(),
        );

        let response = server.handle_request(get("/admin"), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["admin"], json!(true));

        // Declared method binds; other methods fall through to 404.
        let request = Request::builder()
            .method(Method::DELETE)
            .uri("/admin")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let response = server.handle_request(request, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_dynamic_handler_publishes_on_bus() {
        let config: ServeConfig = serde_json::from_value(json!({
            "handlers": [
                {"path": "/notify", "method": "POST", "handler": "notify"}
            ]
        }))
        .unwrap();

        let mut registry = HandlerRegistry::new();
        registry.register("notify", |request: HandlerRequest| async move {
            let payload: serde_json::Value =
                serde_json::from_slice(&request.body).unwrap_or(serde_json::Value::Null);
            request.bus.publish("notifications", payload);
            crate::handlers::HandlerResponse::json(StatusCode::ACCEPTED, &json!({"ok": true}))
        });

        let server = Arc::new(
            GatewayServer::builder(
                config,
                Arc::new(StaticExecutor),
                Arc::new(EmptyContextBuilder),
            )
            .handlers(registry)
            .build()
            .unwrap(),
        );
        let mut events = server.bus().subscribe("notifications");

        let request = Request::builder()
            .method(Method::POST)
            .uri("/notify")
            .body(Full::new(Bytes::from(r#"{"kind":"deploy"}"#)))
            .unwrap();
        let response = server.handle_request(request, None).await;

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(events.next().await, Some(json!({"kind": "deploy"})));
    }

    #[tokio::test]
    async fn test_unresolved_handler_fails_startup() {
        let config: ServeConfig = serde_json::from_value(json!({
            "handlers": [{"path": "/x", "handler": "ghost"}]
        }))
        .unwrap();

        let result = GatewayServer::builder(
            config,
            Arc::new(StaticExecutor),
            Arc::new(EmptyContextBuilder),
        )
        .build();
        assert!(matches!(
            result.err(),
            Some(StartupError::UnresolvedHandlers { .. })
        ));
    }

    #[tokio::test]
    async fn test_playground_served_on_get_graphql_path() {
        let config = ServeConfig {
            playground: Some(true),
            ..ServeConfig::default()
        };
        let server = build_server(config);

        let response = server.handle_request(get("/graphql"), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/html; charset=utf-8"
        );

        // Root serves the explorer too when no static root shadows it.
        let response = server.handle_request(get("/"), None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_playground_disabled_is_404() {
        let config = ServeConfig {
            playground: Some(false),
            ..ServeConfig::default()
        };
        let server = build_server(config);
        let response = server.handle_request(get("/graphql"), None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_static_root_shadows_playground_at_root_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html>static</html>").unwrap();

        let config = ServeConfig {
            playground: Some(true),
            static_dir: Some(dir.path().to_path_buf()),
            ..ServeConfig::default()
        };
        let server = build_server(config);

        let root = server.handle_request(get("/"), None).await;
        let root_body = root.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(root_body, Bytes::from("<html>static</html>"));

        let explorer = server.handle_request(get("/graphql"), None).await;
        assert_eq!(
            explorer.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/html; charset=utf-8"
        );
    }

    #[tokio::test]
    async fn test_cors_preflight_short_circuits() {
        let config: ServeConfig =
            serde_json::from_value(json!({"cors": {"origins": ["*"]}})).unwrap();
        let server = build_server(config);

        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/graphql")
            .header(header::ORIGIN, "https://app.example")
            .header("access-control-request-method", "POST")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let response = server.handle_request(request, None).await;

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            response
                .headers()
                .get("access-control-allow-origin")
                .unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn test_run_and_shutdown() {
        let config = ServeConfig {
            port: 0,
            ..ServeConfig::default()
        };
        let server = GatewayServer::builder(
            config,
            Arc::new(StaticExecutor),
            Arc::new(EmptyContextBuilder),
        )
        .build()
        .unwrap();

        let shutdown = ShutdownSignal::new();
        shutdown.trigger();

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            server.run_with_shutdown(shutdown),
        )
        .await;
        assert!(result.is_ok());
        assert!(result.unwrap().is_ok());
    }
}
