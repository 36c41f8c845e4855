//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Relay and HTTP server produce:
//!     → logging.rs (structured log events, one span per request)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - The request ID lives in the span only; it is never added to headers
//! - Metrics are off by default

pub mod logging;
pub mod metrics;
