#![forbid(unsafe_code)]
//! Blockchain explorer API server

use chainscope::aggregator::Aggregator;
use chainscope::api::run_api_server;
use chainscope::config::{load_config, Mode};
use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,
    /// Overrides server.port
    #[arg(long)]
    port: Option<u16>,
    /// Serve execution-layer routes only
    #[arg(long)]
    execution_only: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = load_config(&args.config)?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if args.execution_only {
        config.server.mode = Mode::ExecutionOnly;
    }

    let ip: IpAddr = config
        .server
        .bind
        .parse()
        .map_err(|e| format!("Invalid bind address {:?}: {}", config.server.bind, e))?;
    let addr = SocketAddr::new(ip, config.server.port);

    let aggregator = Arc::new(Aggregator::from_config(&config)?);
    run_api_server(aggregator, addr).await
}
