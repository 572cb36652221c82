//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Expose a Prometheus-compatible metrics endpoint
//! - Count finished actions and their downstream calls
//! - Count slow operations by dependency kind and error code
//!
//! # Metrics
//! - `action_total` (counter): finished actions by action, result
//! - `action_duration_seconds` (histogram): action latency distribution
//! - `action_dependency_calls_total` (counter): tracked calls by action, kind
//! - `slow_operations_total` (counter): threshold breaches by kind, error_code
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - Action names come from route templates, which keeps label sets bounded

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

use crate::log::record::ActionRecord;

pub mod names {
    pub const ACTION_TOTAL: &str = "action_total";
    pub const ACTION_DURATION_SECONDS: &str = "action_duration_seconds";
    pub const ACTION_DEPENDENCY_CALLS_TOTAL: &str = "action_dependency_calls_total";
    pub const SLOW_OPERATIONS_TOTAL: &str = "slow_operations_total";
}

/// Install the Prometheus recorder with an HTTP listener on `addr`.
///
/// Returns false if a recorder is already installed or the listener fails.
pub fn init_metrics(addr: SocketAddr) -> bool {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            tracing::info!(address = %addr, "Metrics endpoint listening");
            true
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Prometheus exporter");
            false
        }
    }
}

/// Record a finished action.
pub fn record_action(record: &ActionRecord) {
    let result = match &record.error_code {
        Some(code) => code.clone(),
        None if record.is_failure() => "error".to_string(),
        None => "ok".to_string(),
    };

    counter!(
        names::ACTION_TOTAL,
        "action" => record.action_name.clone(),
        "result" => result
    )
    .increment(1);

    histogram!(
        names::ACTION_DURATION_SECONDS,
        "action" => record.action_name.clone()
    )
    .record(record.elapsed.as_secs_f64());

    for (kind, stat) in &record.stats {
        counter!(
            names::ACTION_DEPENDENCY_CALLS_TOTAL,
            "action" => record.action_name.clone(),
            "kind" => kind.clone()
        )
        .increment(stat.count);
    }
}

/// Record a threshold breach.
pub fn record_slow_operation(kind: &str, error_code: &str) {
    counter!(
        names::SLOW_OPERATIONS_TOTAL,
        "kind" => kind.to_string(),
        "error_code" => error_code.to_string()
    )
    .increment(1);
}
