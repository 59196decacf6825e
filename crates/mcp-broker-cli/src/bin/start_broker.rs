//! Starts the broker: loads config, builds the downstream pool, and runs
//! one stdio session until EOF or Ctrl-C.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use mcp_broker_auth::JwtVerifier;
use mcp_broker_config::BrokerConfig;
use mcp_broker_core::{ClientManager, ToolAggregator};
use mcp_broker_server::{run_stdio, BrokerSession};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(name = "start_broker")]
#[command(about = "Run the MCP broker over stdio")]
struct Args {
    /// Explicit config file path (overrides the usual discovery order).
    #[arg(long, env = "MCP_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Public key (PEM, RSA) used to verify client bearer tokens.
    #[arg(long, env = "MCP_JWT_PUBLIC_KEY_PATH")]
    jwt_public_key: Option<PathBuf>,

    /// Permit unauthenticated sessions to see every tool (development mode).
    /// Off by default: an implicit bypass is a deployment hazard, so it
    /// must be turned on explicitly.
    #[arg(long)]
    allow_unauthenticated: bool,

    /// Enable debug-level logging.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _guard = init_tracing(args.verbose);

    let config = load_config(args.config.as_deref()).context("failed to load broker config")?;
    let require_auth = config.require_auth && !args.allow_unauthenticated;

    let verifier = match args.jwt_public_key {
        Some(path) => {
            let pem = std::fs::read(&path)
                .with_context(|| format!("failed to read JWT public key at {}", path.display()))?;
            Some(Arc::new(JwtVerifier::from_pem(&pem).context("invalid JWT public key")?))
        }
        None => {
            if require_auth {
                tracing::warn!(
                    "no --jwt-public-key configured; every session will run unauthenticated"
                );
            }
            None
        }
    };

    let manager = ClientManager::start(config.servers);
    let aggregator = Arc::new(ToolAggregator::new(manager));
    let session = BrokerSession::new(aggregator, verifier, require_auth);

    tokio::select! {
        result = run_stdio(session) => result.context("session ended with a stream error"),
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received shutdown signal");
            Ok(())
        }
    }
}

fn load_config(path: Option<&std::path::Path>) -> mcp_broker_config::Result<BrokerConfig> {
    match path {
        Some(path) => mcp_broker_config::load_config_file(path),
        None => mcp_broker_config::load_config(),
    }
}

fn init_tracing(verbose: bool) -> tracing_appender::non_blocking::WorkerGuard {
    let filter = if verbose {
        "mcp_broker=debug,info"
    } else {
        "mcp_broker=info,warn"
    };

    let log_dir = dirs::home_dir()
        .map(|d| d.join(".config").join("mcp_broker").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));
    let file_appender = tracing_appender::rolling::daily(&log_dir, "broker.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    guard
}
