//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → CLI overrides (main.rs)
//!     → validation.rs (semantic checks)
//!     → RelayConfig (validated, immutable)
//!     → injected into the Relay at construction
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; no runtime reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, resolve_config, ConfigError, ConfigOverrides};
pub use schema::{
    LimitsConfig, ListenerConfig, LogFormat, ObservabilityConfig, RelayConfig, TimeoutConfig,
    UpstreamConfig,
};
pub use validation::{upstream_uri, validate_config, ValidationError};
