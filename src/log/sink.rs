//! Log sinks.
//!
//! # Responsibilities
//! - Receive every `LogRecord` and every flushed `ActionRecord`
//! - Render them to `tracing`, JSON lines, or memory (tests)
//!
//! # Design Decisions
//! - `TracingSink` is the default so one subscriber renders everything
//! - Event fields use the records' camelCase names; absent codes and
//!   severities are left out rather than written empty
//! - `tracing` fields are flat, so `TracingSink` renders `stats` as JSON
//!   text; `RoutedSink` sends action records to `JsonLinesSink` when the
//!   nested shape is needed
//! - Sinks must not call back into loggers

use chrono::SecondsFormat;
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

use crate::log::level::Level;
use crate::log::marker::Severity;
use crate::log::record::{ActionRecord, LogRecord};

/// `tracing` target of flushed action records.
pub const ACTION_TARGET: &str = "action_log";

/// Destination for emitted records.
pub trait LogSink: Send + Sync {
    fn write_log(&self, record: &LogRecord);

    fn write_action(&self, record: &ActionRecord);
}

/// Forwards records as `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write_log(&self, record: &LogRecord) {
        let logger = record.logger.as_str();
        let action_id = record.action_id.as_deref();
        let error_code = record.error_code.as_deref();
        let severity = record.severity.map(|severity| severity.as_str());
        match record.level {
            Level::Trace => tracing::trace!(logger, actionId = action_id, "{}", record.message),
            Level::Debug => tracing::debug!(logger, actionId = action_id, "{}", record.message),
            Level::Info => tracing::info!(logger, actionId = action_id, "{}", record.message),
            Level::Warn => tracing::warn!(
                logger,
                actionId = action_id,
                errorCode = error_code,
                severity,
                "{}",
                record.message
            ),
            Level::Error => tracing::error!(
                logger,
                actionId = action_id,
                errorCode = error_code,
                severity,
                "{}",
                record.message
            ),
        }
    }

    fn write_action(&self, record: &ActionRecord) {
        let id = record.id.as_str();
        let started_at = record.started_at.to_rfc3339_opts(SecondsFormat::AutoSi, true);
        let elapsed = u64::try_from(record.elapsed.as_nanos()).unwrap_or(u64::MAX);
        let stats = serde_json::to_string(&record.stats).unwrap_or_default();
        let error_code = record.error_code.as_deref();
        match record.severity {
            None => tracing::info!(
                target: ACTION_TARGET,
                id,
                actionName = %record.action_name,
                startedAt = %started_at,
                elapsed,
                stats = %stats,
                "action completed"
            ),
            Some(Severity::Warn) => tracing::warn!(
                target: ACTION_TARGET,
                id,
                actionName = %record.action_name,
                startedAt = %started_at,
                elapsed,
                stats = %stats,
                errorCode = error_code,
                severity = Severity::Warn.as_str(),
                "action failed"
            ),
            Some(Severity::Error) => tracing::error!(
                target: ACTION_TARGET,
                id,
                actionName = %record.action_name,
                startedAt = %started_at,
                elapsed,
                stats = %stats,
                errorCode = error_code,
                severity = Severity::Error.as_str(),
                "action failed"
            ),
        }
    }
}

/// Sends log records and action records to separate sinks.
pub struct RoutedSink {
    logs: Arc<dyn LogSink>,
    actions: Arc<dyn LogSink>,
}

impl RoutedSink {
    pub fn new(logs: Arc<dyn LogSink>, actions: Arc<dyn LogSink>) -> Self {
        Self { logs, actions }
    }
}

impl LogSink for RoutedSink {
    fn write_log(&self, record: &LogRecord) {
        self.logs.write_log(record);
    }

    fn write_action(&self, record: &ActionRecord) {
        self.actions.write_action(record);
    }
}

impl std::fmt::Debug for RoutedSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutedSink").finish_non_exhaustive()
    }
}

/// Writes each record as one JSON line.
pub struct JsonLinesSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_json<T: serde::Serialize>(&self, kind: &str, value: &T) {
        let line = match serde_json::to_string(value) {
            Ok(line) => line,
            Err(e) => {
                tracing::error!(kind, error = %e, "Failed to serialize record");
                return;
            }
        };
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(writer, "{}", line) {
            // dropped, sink backpressure is the writer's concern
            tracing::error!(kind, error = %e, "Failed to write record");
        }
    }
}

impl<W: Write + Send> LogSink for JsonLinesSink<W> {
    fn write_log(&self, record: &LogRecord) {
        self.write_json("log", record);
    }

    fn write_action(&self, record: &ActionRecord) {
        self.write_json("action", record);
    }
}

/// Keeps records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    logs: Mutex<Vec<LogRecord>>,
    actions: Mutex<Vec<ActionRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logs(&self) -> Vec<LogRecord> {
        self.logs.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn actions(&self) -> Vec<ActionRecord> {
        self.actions.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Records marked with `error_code`.
    pub fn coded(&self, error_code: &str) -> Vec<LogRecord> {
        self.logs()
            .into_iter()
            .filter(|record| record.error_code.as_deref() == Some(error_code))
            .collect()
    }

    pub fn clear(&self) {
        self.logs.lock().unwrap_or_else(PoisonError::into_inner).clear();
        self.actions.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl LogSink for MemorySink {
    fn write_log(&self, record: &LogRecord) {
        self.logs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
    }

    fn write_action(&self, record: &ActionRecord) {
        self.actions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
    }
}
