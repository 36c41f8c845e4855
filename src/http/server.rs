//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the relay handler on every path and method
//! - Wire up middleware (tracing span per request)
//! - Bind server to listener
//! - Stop accepting on shutdown, drain best-effort for a bounded time

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::Response,
    routing::any,
    Router,
};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::config::{upstream_uri, RelayConfig, ValidationError};
use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;
use crate::relay::Relay;
use crate::upstream::{HyperUpstream, UpstreamClient};

/// HTTP server for the CORS relay.
pub struct HttpServer {
    router: Router,
    config: RelayConfig,
}

impl HttpServer {
    /// Create a server forwarding through the hyper-util client.
    pub fn new(config: RelayConfig) -> Result<Self, ValidationError> {
        let client = HyperUpstream::new(&config.timeouts);
        Self::with_client(config, client)
    }

    /// Create a server forwarding through any upstream client.
    pub fn with_client<C: UpstreamClient>(
        config: RelayConfig,
        client: C,
    ) -> Result<Self, ValidationError> {
        let target = upstream_uri(&config.upstream)?;
        let relay = Relay::new(client, target, config.limits.max_body_size)
            .with_wrap_error_status(config.upstream.wrap_error_status);

        let router = Self::build_router(Arc::new(relay));
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router<C: UpstreamClient>(relay: Arc<Relay<C>>) -> Router {
        Router::new()
            .route("/{*path}", any(relay_handler::<C>))
            .route("/", any(relay_handler::<C>))
            .with_state(relay)
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
    }

    /// The router, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener until
    /// the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.url,
            "HTTP server starting"
        );

        let grace = self.config.timeouts.shutdown_grace();
        let (stopped_tx, stopped_rx) = oneshot::channel();

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
            shutdown.wait().await;
            tracing::info!("Shutdown signal received, no longer accepting connections");
            let _ = stopped_tx.send(());
        })
        .into_future();

        tokio::select! {
            result = serve => result?,
            _ = drain_deadline(stopped_rx, grace) => {
                tracing::warn!(grace = ?grace, "Drain deadline elapsed, dropping open connections");
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Resolves `grace` after the listener stopped accepting.
async fn drain_deadline(stopped: oneshot::Receiver<()>, grace: Duration) {
    match stopped.await {
        Ok(()) => tokio::time::sleep(grace).await,
        Err(_) => std::future::pending().await,
    }
}

/// Every path and method lands here.
async fn relay_handler<C: UpstreamClient>(
    State(relay): State<Arc<Relay<C>>>,
    request: Request<Body>,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();

    let response = relay.handle(request).await;

    metrics::record_request(&method, response.status().as_u16(), start);
    response
}

fn make_span(request: &Request<Body>) -> tracing::Span {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    tracing::info_span!(
        "request",
        request_id = %Uuid::new_v4(),
        method = %request.method(),
        path = %request.uri().path(),
        peer = %peer,
    )
}
