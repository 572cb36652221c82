//! Logging subsystem.
//!
//! # Data Flow
//! ```text
//! Logger::warn_with(marker, args)
//!     → level check (level.rs, resolved once per logger name)
//!     → format + MessageFilter (filter.rs)
//!     → LogRecord (record.rs), stamped with the bound action id
//!     → LogManager → LogSink (sink.rs)
//!
//! LogManager::end(handle, outcome)
//!     → ActionRecord (record.rs) → LogSink
//! ```
//!
//! # Design Decisions
//! - One process-wide factory, installed once with `init`
//! - `get_logger` falls back to a default factory when nothing was installed
//! - Explicit `LoggerFactory` instances work without the global one
//! - Call sites log through `log_debug!`-style macros over `Logger`

pub mod factory;
pub mod filter;
pub mod level;
pub mod logger;
mod macros;
pub mod marker;
pub mod record;
pub mod sink;

use std::sync::{Arc, OnceLock};

use crate::action::manager::LogManager;
use crate::error::{ActionLogError, Result};

pub use factory::LoggerFactory;
pub use level::{Level, TraceLevelResolver, TraceLevelRule};
pub use logger::Logger;
pub use marker::{CodedError, ErrorCode, Failure, Marker, Severity};
pub use record::{ActionRecord, ActionStat, LogRecord};

static FACTORY: OnceLock<LoggerFactory> = OnceLock::new();

/// Install the process-wide factory.
pub fn init(factory: LoggerFactory) -> Result<&'static LoggerFactory> {
    FACTORY
        .set(factory)
        .map_err(|_| ActionLogError::FactoryInitialized)?;
    Ok(self::factory())
}

/// The process-wide factory, created with defaults on first use.
pub fn factory() -> &'static LoggerFactory {
    FACTORY.get_or_init(LoggerFactory::default)
}

pub fn get_logger(name: &str) -> Arc<Logger> {
    factory().get_logger(name)
}

pub fn manager() -> &'static Arc<LogManager> {
    factory().manager()
}
