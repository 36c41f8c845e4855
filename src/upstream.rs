//! Upstream client capability.
//!
//! # Responsibilities
//! - Define the seam the relay calls the upstream through
//! - Provide the production implementation on the hyper-util client
//! - Bound every call by a deadline on the response head
//!
//! # Design Decisions
//! - One attempt per call; nothing here retries
//! - A non-2xx status is a normal response at this layer, classification
//!   happens in the relay
//! - Dropping the returned future abandons the upstream call

use std::error::Error as StdError;
use std::future::Future;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;

use crate::config::TimeoutConfig;

/// Failures that leave no upstream HTTP response to look at.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("connection to upstream failed: {0}")]
    Connect(String),

    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),

    #[error("upstream request failed: {0}")]
    Request(String),

    #[error("could not build upstream request: {0}")]
    InvalidRequest(String),
}

impl UpstreamError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamError::Connect(_) => "connect",
            UpstreamError::Timeout(_) => "timeout",
            UpstreamError::Request(_) => "request",
            UpstreamError::InvalidRequest(_) => "invalid_request",
        }
    }
}

/// Something that can carry one request to the upstream and bring back its
/// response.
pub trait UpstreamClient: Send + Sync + 'static {
    fn send(
        &self,
        request: Request<Body>,
    ) -> impl Future<Output = Result<Response<Body>, UpstreamError>> + Send;
}

/// Production client backed by the hyper-util connection pool.
#[derive(Clone)]
pub struct HyperUpstream {
    client: Client<HttpConnector, Body>,
    request_timeout: Duration,
}

impl HyperUpstream {
    pub fn new(timeouts: &TimeoutConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(timeouts.connect()));

        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            client,
            request_timeout: timeouts.request(),
        }
    }
}

impl UpstreamClient for HyperUpstream {
    async fn send(&self, request: Request<Body>) -> Result<Response<Body>, UpstreamError> {
        let response = tokio::time::timeout(self.request_timeout, self.client.request(request))
            .await
            .map_err(|_| UpstreamError::Timeout(self.request_timeout))?
            .map_err(|e| {
                if e.is_connect() {
                    UpstreamError::Connect(error_chain(&e))
                } else {
                    UpstreamError::Request(error_chain(&e))
                }
            })?;

        Ok(response.map(Body::new))
    }
}

/// Render an error with all of its sources, `outer: inner: root`.
fn error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
