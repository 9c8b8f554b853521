//! Access Gateway
//!
//! An identity-aware access decision service built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                              ┌──────────────────────────────────────────────────────┐
//!                              │                   ACCESS GATEWAY                     │
//!                              │                                                      │
//!     Decision Request         │  ┌─────────┐    ┌─────────┐    ┌──────────────┐     │
//!     ─────────────────────────┼─▶│  http   │───▶│ routing │───▶│    rules     │     │
//!                              │  │ server  │    │ router  │    │   (Rule)     │     │
//!                              │  └─────────┘    └─────────┘    └──────┬───────┘     │
//!                              │                                       │              │
//!                              │                                       ▼              │
//!                              │                               ┌──────────────┐      │
//!                              │                               │   pipeline   │      │
//!                              │                               │  composites  │      │
//!                              │                               └──────┬───────┘      │
//!                              │                                       │              │
//!                              │                                       ▼              │
//!     Decision Response        │  ┌─────────┐                  ┌──────────────┐      │
//!     ◀────────────────────────┼──│response │◀─────────────────│  mechanisms  │      │
//!                              │  │ mapping │                  │ (prototypes) │      │
//!                              │  └─────────┘                  └──────────────┘      │
//!                              │                                                      │
//!                              │  ┌────────────────────────────────────────────────┐ │
//!                              │  │             Cross-Cutting Concerns             │ │
//!                              │  │  ┌─────────┐ ┌──────────────┐ ┌─────────────┐  │ │
//!                              │  │  │ config  │ │observability │ │  lifecycle  │  │ │
//!                              │  │  │+ watcher│ │  (logging)   │ │startup/stop │  │ │
//!                              │  │  └─────────┘ └──────────────┘ └─────────────┘  │ │
//!                              │  └────────────────────────────────────────────────┘ │
//!                              └──────────────────────────────────────────────────────┘
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use access_gateway::config::load_config;
use access_gateway::config::watcher::ConfigWatcher;
use access_gateway::http::HttpServer;
use access_gateway::lifecycle::signals::shutdown_signal;
use access_gateway::lifecycle::startup::reload;
use access_gateway::lifecycle::{Gateway, Shutdown};
use access_gateway::observability::logging;
use access_gateway::GatewayConfig;

#[derive(Parser)]
#[command(name = "access-gateway")]
#[command(about = "Identity-aware access decision service", long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "gateway.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the decision service (default)
    Serve,
    /// Load the configuration, compile all rules and exit
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    logging::init(&config.observability);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Validate => {
            let gateway = Gateway::build(&config)?;
            tracing::info!(rules = gateway.router().len(), "Configuration is valid");
            Ok(())
        }
        Commands::Serve => serve(&cli.config, config).await,
    }
}

async fn serve(config_path: &Path, config: GatewayConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("access-gateway v0.1.0 starting");

    let gateway = Arc::new(ArcSwap::from_pointee(Gateway::build(&config)?));

    tracing::info!(
        bind_address = %config.serve.bind_address,
        mode = ?config.serve.mode,
        "Configuration loaded"
    );

    let shutdown = Shutdown::new();

    // Watch the config file and the rule sets known at startup.
    let mut watched: Vec<&Path> = vec![config_path];
    watched.extend(config.rule_sets.iter().map(PathBuf::as_path));
    let (watcher, mut changes) = ConfigWatcher::new(&watched);
    let _watcher = watcher.run()?;

    let reload_target = gateway.clone();
    let reload_path = config_path.to_path_buf();
    let mut reload_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                changed = changes.recv() => {
                    let Some(changed) = changed else { break };
                    tracing::debug!(path = %changed.display(), "Reloading after change");
                    if let Err(err) = reload(&reload_target, &reload_path) {
                        tracing::error!(error = %err, "Failed to reload configuration. Keeping current rules.");
                    }
                }
                _ = reload_shutdown.recv() => break,
            }
        }
    });

    let listener = TcpListener::bind(&config.serve.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server_shutdown: broadcast::Receiver<()> = shutdown.subscribe();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.trigger();
    });

    HttpServer::new(gateway).run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
