//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber that `TracingSink` writes to
//! - Pick JSON or pretty output from configuration
//!
//! # Design Decisions
//! - `RUST_LOG` overrides the configured level when set
//! - Action records always pass the subscriber filter; per-logger levels
//!   are already applied before a record reaches tracing

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

use crate::config::{LogConfig, LogFormat};
use crate::log::sink::ACTION_TARGET;

/// Directive string used when `RUST_LOG` is unset.
pub fn default_directives(config: &LogConfig) -> String {
    format!(
        "{},{}=trace,tower_http=debug",
        config.default_level.as_str().to_ascii_lowercase(),
        ACTION_TARGET
    )
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &LogConfig) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(config)));

    let registry = tracing_subscriber::registry().with(filter);
    match config.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
            .try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    }
}
