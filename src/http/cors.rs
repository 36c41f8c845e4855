//! The fixed CORS header set.
//!
//! Every response leaving the relay carries exactly these five headers with
//! exactly these values, whatever the upstream said. `mcp-session-id` has to
//! be exposed, otherwise browser scripts cannot read the session handshake.

use axum::http::header::{
    HeaderMap, HeaderName, HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS,
    ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_EXPOSE_HEADERS,
    ACCESS_CONTROL_MAX_AGE,
};

/// Session header the upstream protocol hands out and expects back.
pub const MCP_SESSION_ID: &str = "mcp-session-id";

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_METHODS: &str = "GET, POST, OPTIONS, DELETE";
pub const ALLOW_HEADERS: &str = "Content-Type, Accept, mcp-session-id, X-MCP-Session-ID";
pub const EXPOSE_HEADERS: &str = MCP_SESSION_ID;
pub const MAX_AGE: &str = "3600";

/// The five headers in the order they are written.
pub const CORS_HEADERS: [(HeaderName, &str); 5] = [
    (ACCESS_CONTROL_ALLOW_ORIGIN, ALLOW_ORIGIN),
    (ACCESS_CONTROL_ALLOW_METHODS, ALLOW_METHODS),
    (ACCESS_CONTROL_ALLOW_HEADERS, ALLOW_HEADERS),
    (ACCESS_CONTROL_EXPOSE_HEADERS, EXPOSE_HEADERS),
    (ACCESS_CONTROL_MAX_AGE, MAX_AGE),
];

/// Write the CORS set, replacing any value already present under those names.
pub fn apply_cors_headers(headers: &mut HeaderMap) {
    for (name, value) in CORS_HEADERS {
        headers.insert(name, HeaderValue::from_static(value));
    }
}

/// Upstream headers dropped before copying, so they cannot leak through
/// next to the relay's own values.
pub fn is_overridden_by_relay(name: &HeaderName) -> bool {
    *name == ACCESS_CONTROL_ALLOW_ORIGIN || *name == ACCESS_CONTROL_ALLOW_METHODS
}
