//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, one span per request)
//!     → relay (crate::relay, dispatch by method)
//!     → request.rs (read body, strip hop-by-hop headers)
//!     → upstream client
//!     → response.rs (copy headers, add CORS set, or build error envelope)
//!     → Send to client
//! ```

pub mod cors;
pub mod request;
pub mod response;
pub mod server;

pub use cors::apply_cors_headers;
pub use response::ErrorEnvelope;
pub use server::HttpServer;
