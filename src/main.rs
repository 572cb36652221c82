//! Demo server for the action log.
//!
//! Every request becomes one action. Per-logger records go through the
//! tracing subscriber; action records are written to stdout as JSON lines
//! with their nested stats.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use action_log::config::{load_config, ActionLogConfig};
use action_log::http::{AppState, HttpServer};
use action_log::log::sink::{JsonLinesSink, RoutedSink, TracingSink};
use action_log::log::{self, LoggerFactory};
use action_log::observability::{logging, metrics};

#[derive(Debug, Parser)]
#[command(name = "action-log", version, about = "Action log demo server")]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ActionLogConfig::default(),
    };

    logging::init_logging(&config.log)?;
    tracing::info!("action-log v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.server.bind_address,
        default_level = %config.log.default_level,
        trace_levels = config.log.trace_levels.len(),
        "Configuration loaded"
    );

    let sink = RoutedSink::new(Arc::new(TracingSink), Arc::new(JsonLinesSink::new(std::io::stdout())));
    let factory = log::init(LoggerFactory::from_config(&config.log, Arc::new(sink)))?;

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                metrics::init_metrics(addr);
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(AppState::new(&config, factory));
    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
