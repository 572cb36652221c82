//! Action log: per-unit-of-work correlation context and structured logging.
//!
//! Every inbound unit of work (HTTP request, scheduled job, message handler)
//! opens an action. Downstream clients report their elapsed time into it and
//! warn with stable error codes when they are slow. When the unit of work
//! ends, one aggregated `ActionRecord` is flushed, classified by the failure's
//! error code and severity.
//!
//! # Architecture Overview
//!
//! ```text
//!   dispatcher ──▶ action::manager ──begin/end──▶ action::context
//!       │                │                            ▲
//!       │                ▼                            │ track(kind, elapsed)
//!       │           log::sink ◀── log::logger ◀──┐    │
//!       ▼                                        │    │
//!   business logic ──▶ clients::{store, search} ─┴────┘
//!                            │
//!                            └── clients::observer (threshold checks)
//! ```

// Core subsystems
pub mod action;
pub mod error;
pub mod log;

// Downstream clients
pub mod clients;

// Cross-cutting concerns
pub mod config;
pub mod http;
pub mod observability;

pub use action::{ActionHandle, LogManager, Outcome};
pub use config::ActionLogConfig;
pub use error::{ActionLogError, Result};
pub use http::HttpServer;
pub use log::{get_logger, ErrorCode, Level, Logger, LoggerFactory, Marker, Severity};
