//! Request handling and transformation.
//!
//! # Responsibilities
//! - Read the inbound body eagerly, bounded by the configured limit
//! - Strip the headers that only describe the inbound connection
//! - Build the request sent to the fixed upstream target
//!
//! # Design Decisions
//! - Only `Host` and `Connection` are removed; everything else, including
//!   the session header, passes through untouched
//! - The inbound path and query are ignored: there is exactly one target
//! - Nothing is added to the forwarded headers (no request ID, no X-Forwarded-*)

use axum::body::{Body, Bytes};
use axum::http::header::{HeaderMap, HeaderName, CONNECTION, HOST};
use axum::http::{Method, Request, Uri};

/// Headers valid only for the original connection.
pub const HOP_BY_HOP: [HeaderName; 2] = [HOST, CONNECTION];

/// Copy every inbound header except the hop-by-hop ones.
///
/// Repeated headers keep all of their values in their original order.
pub fn forwarded_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(inbound.len());
    for (name, value) in inbound {
        if !HOP_BY_HOP.contains(name) {
            headers.append(name.clone(), value.clone());
        }
    }
    headers
}

/// Build the upstream request for an inbound exchange.
///
/// An empty body is sent as no body at all.
pub fn build_forward_request(
    method: Method,
    target: &Uri,
    inbound: &HeaderMap,
    body: Bytes,
) -> Result<Request<Body>, axum::http::Error> {
    let mut builder = Request::builder().method(method).uri(target.clone());
    if let Some(headers) = builder.headers_mut() {
        *headers = forwarded_headers(inbound);
    }

    let body = if body.is_empty() {
        Body::empty()
    } else {
        Body::from(body)
    };
    builder.body(body)
}

/// Read the whole inbound body, failing once it exceeds `limit` bytes.
pub async fn read_body(body: Body, limit: usize) -> Result<Bytes, axum::Error> {
    axum::body::to_bytes(body, limit).await
}
