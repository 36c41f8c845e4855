//! CORS relay library.
//!
//! Forwards every browser request to one fixed JSON-RPC / event-stream
//! upstream and makes the answers readable cross-origin.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod relay;
pub mod upstream;

pub use config::schema::RelayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use relay::{Relay, RelayError};
pub use upstream::{HyperUpstream, UpstreamClient, UpstreamError};
