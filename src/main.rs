//! Contract proxy
//!
//! A reverse proxy that validates backend responses against a Swagger 2.0
//! contract while passing traffic through unchanged.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌──────────────────────────────────────────────────────┐
//!                  │                   CONTRACT PROXY                      │
//!                  │                                                       │
//!   Client Request │  ┌─────────┐    ┌──────────┐    ┌───────────┐         │
//!   ───────────────┼─▶│  http   │───▶│ dispatch │───▶│  forward  │─────────┼──▶ Backend
//!                  │  │ server  │    │  + route │    │           │         │
//!                  │  └─────────┘    └──────────┘    └─────┬─────┘         │
//!                  │                                       │               │
//!   Client Response│  ┌──────────┐                         │               │
//!   ◀──────────────┼──│ recorder │◀────────────────────────┘               │
//!                  │  └────┬─────┘                                         │
//!                  │       │ capture                                       │
//!                  │       ▼                                               │
//!                  │  ┌────────────┐    ┌───────────┐                      │
//!                  │  │ validation │───▶│ reporting │                      │
//!                  │  └────────────┘    └───────────┘                      │
//!                  └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use contract_proxy::config::{resolve_config, ConfigOverrides};
use contract_proxy::contract::load_contract;
use contract_proxy::lifecycle::{signals, Shutdown};
use contract_proxy::observability::{logging, metrics};
use contract_proxy::{ContractProxy, HttpServer, ProxyOptions, TracingReporter};

#[derive(Parser, Debug)]
#[command(name = "contract-proxy", version, about = "Reverse proxy that checks responses against a Swagger contract")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the Swagger 2.0 document (JSON or YAML).
    #[arg(short, long)]
    spec: Option<PathBuf>,

    /// Backend base URL.
    #[arg(short, long)]
    target: Option<String>,

    /// Address to listen on.
    #[arg(short, long)]
    bind: Option<String>,

    /// Log every registered route.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let overrides = ConfigOverrides {
        contract: cli.spec,
        target: cli.target,
        bind_address: cli.bind,
        verbose: cli.verbose,
    };
    let config = resolve_config(cli.config.as_deref(), overrides)?;

    logging::init_logging(&config.observability);
    tracing::info!("contract-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    let contract_path = config
        .contract
        .path
        .clone()
        .ok_or("no contract document given, use --spec or [contract] path")?;
    let document = load_contract(&contract_path)?;

    if config.observability.metrics_enabled {
        // Checked during config validation.
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr);
    }

    let options = ProxyOptions::default()
        .with_target(config.upstream.target.clone())
        .with_verbose(config.verbose);
    let proxy = ContractProxy::new(document, Arc::new(TracingReporter), options)?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        request_timeout_secs = config.timeouts.request_secs,
        "Listening for connections"
    );

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(&shutdown);

    let server = HttpServer::new(config, proxy);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
