//! Response handling and transformation.
//!
//! # Responsibilities
//! - Transform the upstream response for the browser
//! - Synthesize preflight answers and JSON-RPC error envelopes
//! - Guarantee the CORS set on every one of them
//!
//! # Design Decisions
//! - Bodies are streamed through untouched (event-stream framing survives)
//! - Status and non-CORS headers are copied verbatim
//! - Error envelopes are JSON-RPC shaped so browser callers can parse them
//!   like any other reply

use axum::body::Body;
use axum::http::header::{HeaderValue, ALLOW};
use axum::http::{Response, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::http::cors::{apply_cors_headers, is_overridden_by_relay, ALLOW_METHODS};

/// Id carried by every envelope the relay synthesizes.
pub const PROXY_ERROR_ID: &str = "proxy-error";

/// `{"jsonrpc":"2.0","id":"proxy-error","error":{...}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub jsonrpc: String,
    pub id: String,
    pub error: ErrorObject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorObject {
    pub code: u16,
    pub message: String,
}

impl ErrorEnvelope {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: PROXY_ERROR_ID.to_string(),
            error: ErrorObject {
                code,
                message: message.into(),
            },
        }
    }
}

/// Turn an upstream response into the outbound one.
///
/// Upstream `Access-Control-Allow-Origin` / `-Methods` are dropped, the rest
/// is copied, then the CORS set is written over the top.
pub fn relay_response(upstream: Response<Body>) -> Response<Body> {
    let (parts, body) = upstream.into_parts();

    let mut response = Response::new(body);
    *response.status_mut() = parts.status;

    let headers = response.headers_mut();
    for (name, value) in &parts.headers {
        if !is_overridden_by_relay(name) {
            headers.append(name.clone(), value.clone());
        }
    }
    apply_cors_headers(headers);

    response
}

/// 200, empty body, CORS set only.
pub fn preflight_response() -> Response<Body> {
    let mut response = Response::new(Body::empty());
    apply_cors_headers(response.headers_mut());
    response
}

/// A JSON-RPC error envelope with `status` as both HTTP status and error code.
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response<Body> {
    let envelope = ErrorEnvelope::new(status.as_u16(), message);
    let mut response = (status, Json(envelope)).into_response();
    apply_cors_headers(response.headers_mut());
    response
}

/// 405 for methods the relay does not forward.
pub fn method_not_allowed() -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::METHOD_NOT_ALLOWED;
    response
        .headers_mut()
        .insert(ALLOW, HeaderValue::from_static(ALLOW_METHODS));
    apply_cors_headers(response.headers_mut());
    response
}
