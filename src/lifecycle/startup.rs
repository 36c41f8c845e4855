//! Startup orchestration.
//!
//! # Responsibilities
//! - Start background services (metrics endpoint)
//! - Build the relay from the validated configuration
//! - Bind the listener and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener binds last (traffic only when ready)

use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::{RelayConfig, ValidationError};
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ValidationError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error("metrics endpoint: {0}")]
    Metrics(String),

    #[error("server error: {0}")]
    Serve(std::io::Error),
}

/// Run the relay until SIGINT/SIGTERM.
pub async fn run(config: RelayConfig) -> Result<(), StartupError> {
    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone());
    run_until(config, shutdown).await
}

/// Run the relay until `shutdown` is triggered.
pub async fn run_until(config: RelayConfig, shutdown: Shutdown) -> Result<(), StartupError> {
    // Taken before any await so a stop requested during startup still counts.
    let stop = shutdown.signal();

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|e: std::net::AddrParseError| StartupError::Metrics(e.to_string()))?;
        metrics::init_metrics(addr).map_err(|e| StartupError::Metrics(e.to_string()))?;
    }

    let server = HttpServer::new(config.clone())?;

    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: config.listener.bind_address.clone(),
            source,
        })?;
    let local_addr = listener.local_addr().map_err(StartupError::Serve)?;

    tracing::info!(address = %format!("http://{}", local_addr), "CORS relay listening");
    tracing::info!(upstream = %config.upstream.url, "Forwarding requests");

    server
        .run(listener, stop)
        .await
        .map_err(StartupError::Serve)?;

    tracing::info!("CORS relay stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut config = RelayConfig::default();
        config.listener.bind_address = taken.local_addr().unwrap().to_string();

        let err = run_until(config, Shutdown::new()).await.unwrap_err();
        assert!(matches!(err, StartupError::Bind { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn test_stops_on_trigger() {
        let mut config = RelayConfig::default();
        config.listener.bind_address = "127.0.0.1:0".into();
        let shutdown = Shutdown::new();

        let handle = tokio::spawn(run_until(config, shutdown.clone()));
        tokio::time::sleep(Duration::from_millis(200)).await;
        shutdown.trigger();

        let result = tokio::time::timeout(Duration::from_secs(10), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_stop_requested_during_startup_is_honoured() {
        let mut config = RelayConfig::default();
        config.listener.bind_address = "127.0.0.1:0".into();
        let shutdown = Shutdown::new();

        let handle = tokio::spawn(run_until(config, shutdown.clone()));
        shutdown.trigger();

        let result = tokio::time::timeout(Duration::from_secs(3), handle)
            .await
            .expect("relay kept running after an early stop request")
            .unwrap();
        assert!(result.is_ok());
    }
}
