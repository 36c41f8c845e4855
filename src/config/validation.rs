//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and the upstream URL
//! - Validate value ranges (timeouts > 0, limits > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::Uri;
use thiserror::Error;
use url::Url;

use crate::config::schema::{RelayConfig, UpstreamConfig};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: '{value}' is not a valid socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("upstream.url: {0}")]
    InvalidUpstream(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("observability.log_level: unknown level '{0}'")]
    UnknownLogLevel(String),
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(
        "listener.bind_address",
        &config.listener.bind_address,
        &mut errors,
    );

    if let Err(e) = upstream_uri(&config.upstream) {
        errors.push(e);
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.connect_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }
    if config.limits.max_body_size == 0 {
        errors.push(ValidationError::Zero("limits.max_body_size"));
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::UnknownLogLevel(
            config.observability.log_level.clone(),
        ));
    }

    if config.observability.metrics_enabled {
        check_address(
            "observability.metrics_address",
            &config.observability.metrics_address,
            &mut errors,
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Parse the upstream URL into the request target used for every forward.
///
/// Only plain `http` origins are accepted; TLS to the upstream is whatever the
/// host environment provides in front of it.
pub fn upstream_uri(upstream: &UpstreamConfig) -> Result<Uri, ValidationError> {
    let url = Url::parse(&upstream.url)
        .map_err(|e| ValidationError::InvalidUpstream(format!("'{}': {}", upstream.url, e)))?;

    if url.scheme() != "http" {
        return Err(ValidationError::InvalidUpstream(format!(
            "unsupported scheme '{}', expected http",
            url.scheme()
        )));
    }
    if url.host_str().is_none() {
        return Err(ValidationError::InvalidUpstream(format!(
            "'{}' has no host",
            upstream.url
        )));
    }

    Uri::try_from(url.as_str())
        .map_err(|e| ValidationError::InvalidUpstream(format!("'{}': {}", upstream.url, e)))
}

fn check_address(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}
