//! Embedding relay (v0.1)
//!
//! A single-endpoint forward proxy built with Tokio, Axum and reqwest.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────┐
//!                      │                 EMBED RELAY                  │
//!   GET /proxy?url=…   │  ┌────────┐   ┌────────┐   ┌──────────────┐  │
//!   ───────────────────┼─▶│  http  │──▶│ relay  │──▶│   reqwest    │──┼──▶ Target
//!                      │  │ server │   │ target │   │   client     │  │
//!                      │  └────────┘   │headers │   └──────┬───────┘  │
//!                      │               └────────┘          │          │
//!   chunked response   │  ┌────────────────────┐           │          │
//!   ◀──────────────────┼──│ relay::RelayStream │◀──────────┘          │
//!                      │  └────────────────────┘                      │
//!                      │   config · observability · lifecycle         │
//!                      └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use embed_relay::config::{load_config, RelayConfig};
use embed_relay::lifecycle::{spawn_signal_listener, Shutdown};
use embed_relay::observability::init_logging;
use embed_relay::HttpServer;

#[derive(Debug, Parser)]
#[command(name = "embed-relay")]
#[command(version, about = "Forward proxy that relays pages for cross-origin embedding", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long, env = "RELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Interface to bind.
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on.
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,
}

impl Cli {
    /// Command-line and environment values win over the file.
    fn apply_overrides(&self, config: &mut RelayConfig) {
        if let Some(host) = &self.host {
            config.listener.host = host.clone();
        }
        if let Some(port) = self.port {
            config.listener.port = port;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => RelayConfig::default(),
    };
    cli.apply_overrides(&mut config);

    init_logging(&config.observability);

    tracing::info!("embed-relay v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address(),
        upstream_timeout_secs = config.upstream.timeout_secs,
        chunk_size = config.upstream.chunk_size,
        stall_timeout_secs = ?config.upstream.stall_timeout_secs,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(config.listener.bind_address()).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    spawn_signal_listener(shutdown.clone());

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
