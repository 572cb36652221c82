//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML and every
//! field has a default, so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::log::level::{Level, TraceLevelRule, QUIET_PREFIXES};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ActionLogConfig {
    /// Logger levels, output format and message redaction.
    pub log: LogConfig,

    /// Document store client thresholds.
    pub store: StoreConfig,

    /// Search client thresholds.
    pub search: SearchConfig,

    /// Demo HTTP server.
    pub server: ServerConfig,

    /// Metrics exporter.
    pub observability: ObservabilityConfig,
}

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    /// Level for loggers no rule matches.
    pub default_level: Level,

    /// Subscriber output format.
    pub format: LogFormat,

    /// Ordered `prefix -> level` rules; the first match wins.
    pub trace_levels: Vec<TraceLevelRule>,

    /// `key=value` pairs with these keys are masked in messages.
    pub redact_keys: Vec<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_level: Level::Debug,
            format: LogFormat::Pretty,
            trace_levels: QUIET_PREFIXES
                .iter()
                .map(|prefix| TraceLevelRule::new(*prefix, Level::Info))
                .collect(),
            redact_keys: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Operations slower than this log SLOW_MONGODB.
    pub slow_operation_threshold_ms: u64,

    /// Finds returning more rows log TOO_MANY_ROWS_RETURNED.
    pub too_many_rows_returned_threshold: usize,
}

impl StoreConfig {
    pub fn slow_operation_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_operation_threshold_ms)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            slow_operation_threshold_ms: 5_000,
            too_many_rows_returned_threshold: 2_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Queries slower than this log SLOW_QUERY.
    pub slow_query_threshold_ms: u64,
}

impl SearchConfig {
    pub fn slow_query_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_query_threshold_ms)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            slow_query_threshold_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
