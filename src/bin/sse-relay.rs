//! Relay server command line entry point

use std::net::{IpAddr, SocketAddr};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use sse_relay::{RelayServer, ServerConfig};

/// Run an event source relay server
#[derive(Debug, Parser)]
#[command(name = "sse-relay", version)]
struct Args {
    /// Log level
    #[arg(short, long, env = "RELAY_LOGGING", default_value = "info")]
    logging: String,

    /// Enable debug logging
    #[arg(short, long, env = "RELAY_DEBUG")]
    debug: bool,

    /// Server address
    #[arg(short, long, env = "RELAY_ADDRESS", default_value = "127.0.0.1")]
    address: IpAddr,

    /// Server port
    #[arg(short, long, env = "RELAY_PORT", default_value_t = 8000)]
    port: u16,
}

#[tokio::main]
async fn main() -> sse_relay::Result<()> {
    let args = Args::parse();

    let filter = if args.debug {
        "debug".to_string()
    } else {
        args.logging.clone()
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let config = ServerConfig::default().bind(SocketAddr::new(args.address, args.port));
    let server = RelayServer::new(config);

    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Interrupt received, shutting down");
        })
        .await
}
