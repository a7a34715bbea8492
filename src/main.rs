//! Enclave Gateway
//!
//! HTTP gateway in front of a Kurtosis-managed Ethereum devnet.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────────────┐
//!                        │                    ENCLAVE GATEWAY                   │
//!                        │                                                      │
//!    Client Request      │  ┌──────────┐    ┌──────────┐    ┌──────────────┐   │
//!    ────────────────────┼─▶│  http    │───▶│ handlers │───▶│   topology   │───┼──▶ kurtosis CLI
//!                        │  │ server   │    │          │    │   resolver   │   │    (subprocess)
//!                        │  └──────────┘    └────┬─────┘    └──────────────┘   │
//!                        │                       │                              │
//!                        │                       ▼                              │
//!    Client Response     │  ┌──────────┐    ┌──────────┐                        │
//!    ◀───────────────────┼──│ response │◀───│   rpc    │◀───────────────────────┼──▶ Ethereum node
//!                        │  │ + CORS   │    │  client  │                        │    (JSON-RPC)
//!                        │  └──────────┘    └──────────┘                        │
//!                        │                                                      │
//!                        │  config (+ hot reload) · observability · lifecycle   │
//!                        └──────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use enclave_gateway::config::{load_config, validation::validate_config, watcher::ConfigWatcher, GatewayConfig};
use enclave_gateway::lifecycle::{signals, Shutdown};
use enclave_gateway::observability::{logging, metrics};
use enclave_gateway::HttpServer;

#[derive(Parser)]
#[command(name = "enclave-gateway")]
#[command(about = "JSON-RPC gateway for Kurtosis Ethereum enclaves", long_about = None)]
struct Args {
    /// TOML configuration file. Watched for changes when given.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
        validate_config(&config).map_err(|errors| {
            errors.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
        })?;
    }

    logging::init_logging(&config.observability)?;

    tracing::info!("enclave-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        discovery = ?config.discovery.mode,
        rpc_timeout_secs = config.timeouts.rpc_secs,
        discovery_timeout_secs = config.timeouts.discovery_secs,
        cache = config.cache.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    // Hot reload; the watcher must stay alive for the life of the server.
    let (_watcher, config_updates) = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path, config.clone());
            match watcher.run() {
                Ok(handle) => (Some(handle), updates),
                Err(e) => {
                    tracing::warn!(error = %e, "Config watcher unavailable, hot reload disabled");
                    (None, updates)
                }
            }
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(&shutdown);

    let server = HttpServer::new(config)?;
    server.run(listener, config_updates, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
