//! CORS relay.
//!
//! Browser clients cannot talk to a JSON-RPC server that sends no CORS
//! headers. This relay sits in front of it and fixes that.
//!
//! ```text
//!                  ┌──────────────────────────────────────────────┐
//!                  │                  CORS RELAY                  │
//!   Browser        │  ┌────────┐   ┌─────────┐   ┌────────────┐   │
//!   ───────────────┼─▶│  http  │──▶│  relay  │──▶│  upstream  │───┼──▶ Upstream
//!                  │  │ server │   │ dispatch│   │   client   │   │    (JSON-RPC,
//!   ◀──────────────┼──│        │◀──│ + CORS  │◀──│            │◀──┼─── event-stream)
//!                  │  └────────┘   └─────────┘   └────────────┘   │
//!                  └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use cors_relay::config::{load_config, ConfigError, ConfigOverrides, RelayConfig};
use cors_relay::lifecycle::startup;
use cors_relay::observability::logging;

#[derive(Parser)]
#[command(name = "cors-relay")]
#[command(about = "Adds CORS headers to a JSON-RPC upstream so browsers can reach it", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, e.g. 127.0.0.1:9000.
    #[arg(short, long)]
    bind: Option<String>,

    /// Upstream URL every request is forwarded to.
    #[arg(short, long)]
    upstream: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn into_config(self) -> Result<RelayConfig, ConfigError> {
        let overrides = ConfigOverrides {
            bind_address: self.bind,
            upstream_url: self.upstream,
            log_level: self.log_level,
        };
        load_config(self.config.as_deref(), overrides)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().into_config()?;

    logging::init(&config.observability);

    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.url,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
