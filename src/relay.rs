//! The forwarding engine.
//!
//! # Data Flow
//! ```text
//! inbound request
//!     → OPTIONS: preflight answer, upstream never contacted
//!     → GET/POST/DELETE:
//!         read body → strip Host/Connection → one upstream attempt
//!         → 2xx/3xx: relay status, headers, streamed body + CORS set
//!         → 4xx/5xx: JSON-RPC envelope with the same status + CORS set
//!         → no response: JSON-RPC envelope with 500 + CORS set
//!     → anything else: 405 + CORS set
//! ```
//!
//! # Design Decisions
//! - Every failure ends as a well-formed response at this boundary
//! - Target and client are injected at construction; no shared mutable state
//! - No retries: one inbound request, one upstream attempt

use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode, Uri};
use thiserror::Error;

use crate::http::request::{build_forward_request, read_body};
use crate::http::response::{
    error_response, method_not_allowed, preflight_response, relay_response,
};
use crate::upstream::{UpstreamClient, UpstreamError};

/// Why an exchange ended with a synthesized error envelope.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The upstream answered, but with a 4xx/5xx status.
    #[error("MCP Server Error: {reason}")]
    UpstreamStatus { status: StatusCode, reason: String },

    #[error("Proxy Error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("Proxy Error: failed to read request body: {0}")]
    RequestBody(String),
}

impl RelayError {
    /// Status the browser sees for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::UpstreamStatus { status, .. } => *status,
            RelayError::Upstream(_) | RelayError::RequestBody(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn into_response(self) -> Response<Body> {
        error_response(self.status(), self.to_string())
    }
}

/// Forwards browser requests to a single upstream and makes the answers
/// readable cross-origin.
pub struct Relay<C> {
    client: C,
    target: Uri,
    max_body_size: usize,
    wrap_error_status: bool,
}

impl<C: UpstreamClient> Relay<C> {
    pub fn new(client: C, target: Uri, max_body_size: usize) -> Self {
        Self {
            client,
            target,
            max_body_size,
            wrap_error_status: true,
        }
    }

    /// When false, upstream 4xx/5xx responses are relayed like any other.
    pub fn with_wrap_error_status(mut self, wrap: bool) -> Self {
        self.wrap_error_status = wrap;
        self
    }

    /// Handle one inbound exchange. Never fails.
    pub async fn handle(&self, request: Request<Body>) -> Response<Body> {
        let method = request.method().clone();
        match method {
            Method::OPTIONS => self.handle_preflight(&request),
            Method::GET | Method::POST | Method::DELETE => {
                self.handle_forward(request, method).await
            }
            _ => {
                tracing::warn!(method = %method, "Method not supported");
                method_not_allowed()
            }
        }
    }

    pub fn handle_preflight(&self, request: &Request<Body>) -> Response<Body> {
        tracing::info!(path = %request.uri().path(), "CORS preflight");
        preflight_response()
    }

    pub async fn handle_forward(&self, request: Request<Body>, method: Method) -> Response<Body> {
        match self.forward(request, &method).await {
            Ok(response) => {
                tracing::info!(
                    method = %method,
                    status = response.status().as_u16(),
                    "Successfully proxied request"
                );
                relay_response(response)
            }
            Err(e) => {
                match &e {
                    RelayError::UpstreamStatus { status, reason } => tracing::error!(
                        method = %method,
                        status = status.as_u16(),
                        reason = %reason,
                        "HTTP error from upstream"
                    ),
                    RelayError::Upstream(inner) => {
                        tracing::error!(
                            method = %method,
                            target = %self.target,
                            kind = inner.kind(),
                            error = %inner,
                            "Proxy error"
                        );
                        crate::observability::metrics::record_upstream_failure(inner.kind());
                    }
                    RelayError::RequestBody(reason) => tracing::error!(
                        method = %method,
                        error = %reason,
                        "Proxy error reading request body"
                    ),
                }
                e.into_response()
            }
        }
    }

    async fn forward(
        &self,
        request: Request<Body>,
        method: &Method,
    ) -> Result<Response<Body>, RelayError> {
        let (parts, body) = request.into_parts();

        let body = read_body(body, self.max_body_size)
            .await
            .map_err(|e| RelayError::RequestBody(e.to_string()))?;

        let upstream_request =
            build_forward_request(method.clone(), &self.target, &parts.headers, body)
                .map_err(|e| UpstreamError::InvalidRequest(e.to_string()))?;

        tracing::info!(method = %method, target = %self.target, "Proxying request");

        let response = self.client.send(upstream_request).await?;

        let status = response.status();
        if self.wrap_error_status && (status.is_client_error() || status.is_server_error()) {
            return Err(RelayError::UpstreamStatus {
                status,
                reason: reason_phrase(&response),
            });
        }

        Ok(response)
    }
}

/// The reason phrase from the status line, falling back to the canonical one.
fn reason_phrase(response: &Response<Body>) -> String {
    response
        .extensions()
        .get::<hyper::ext::ReasonPhrase>()
        .and_then(|reason| std::str::from_utf8(reason.as_bytes()).ok())
        .or_else(|| response.status().canonical_reason())
        .unwrap_or_default()
        .to_string()
}
