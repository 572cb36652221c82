//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! LogManager / Logger
//!     → TracingSink → logging.rs (tracing subscriber, pretty or JSON)
//! LogManager::end, ThresholdObserver::check
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Action id flows through every record written inside an action
//! - Metrics are cheap and optional

pub mod logging;
pub mod metrics;
