//! Per-name logger.

use chrono::Utc;
use std::fmt;
use std::sync::Weak;

use crate::action::manager::LogManager;
use crate::action::tracker;
use crate::log::level::Level;
use crate::log::marker::{Marker, Severity};
use crate::log::record::LogRecord;

/// Named logging entry point with a fixed effective level.
///
/// Calls below the level return before the message is formatted. Loggers
/// never touch action stats; callers report those through the tracker.
#[derive(Debug)]
pub struct Logger {
    name: String,
    level: Level,
    manager: Weak<LogManager>,
}

impl Logger {
    pub(crate) fn new(name: &str, level: Level, manager: Weak<LogManager>) -> Self {
        Self {
            name: name.to_string(),
            level,
            manager,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Effective level resolved when the logger was created.
    pub fn level(&self) -> Level {
        self.level
    }

    pub fn is_enabled(&self, level: Level) -> bool {
        level >= self.level
    }

    pub fn log(&self, level: Level, marker: Option<&Marker>, args: fmt::Arguments<'_>) {
        if !self.is_enabled(level) {
            return;
        }
        // manager gone or not built yet
        let Some(manager) = self.manager.upgrade() else {
            return;
        };

        let message = manager.filter_message(&self.name, args.to_string());
        let severity = match (marker, level) {
            (Some(_), Level::Warn) => Some(Severity::Warn),
            (Some(_), Level::Error) => Some(Severity::Error),
            _ => None,
        };
        manager.process(LogRecord {
            timestamp: Utc::now(),
            logger: self.name.clone(),
            level,
            message,
            error_code: marker.map(|marker| marker.code().to_string()),
            severity,
            action_id: tracker::id(),
        });
    }

    pub fn trace(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Trace, None, args);
    }

    pub fn debug(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Debug, None, args);
    }

    pub fn info(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Info, None, args);
    }

    pub fn warn(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Warn, None, args);
    }

    pub fn error(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Error, None, args);
    }

    /// Warn with a stable error code for alerting.
    pub fn warn_with(&self, marker: &Marker, args: fmt::Arguments<'_>) {
        self.log(Level::Warn, Some(marker), args);
    }

    pub fn error_with(&self, marker: &Marker, args: fmt::Arguments<'_>) {
        self.log(Level::Error, Some(marker), args);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::sink::MemorySink;
    use std::sync::Arc;

    struct Loud;

    impl fmt::Display for Loud {
        fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
            panic!("formatted a dropped record");
        }
    }

    fn logger(level: Level) -> (Logger, Arc<LogManager>, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let manager = Arc::new(LogManager::new(sink.clone(), None));
        (Logger::new("app::service", level, Arc::downgrade(&manager)), manager, sink)
    }

    #[test]
    fn test_below_level_not_formatted() {
        let (logger, _manager, sink) = logger(Level::Info);
        logger.debug(format_args!("value={}", Loud));
        assert!(sink.logs().is_empty());
    }

    #[test]
    fn test_marked_warning_carries_code() {
        let (logger, _manager, sink) = logger(Level::Debug);
        logger.warn_with(&Marker::error_code("SLOW_MONGODB"), format_args!("slow mongoDB query, elapsed={}", 7));

        let logs = sink.logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].level, Level::Warn);
        assert_eq!(logs[0].error_code.as_deref(), Some("SLOW_MONGODB"));
        assert_eq!(logs[0].severity, Some(Severity::Warn));
        assert_eq!(logs[0].message, "slow mongoDB query, elapsed=7");
    }

    #[test]
    fn test_dropped_manager_is_noop() {
        let (logger, manager, sink) = logger(Level::Trace);
        drop(manager);
        logger.error(format_args!("lost"));
        assert!(sink.logs().is_empty());
    }

    #[test]
    fn test_filter_applied() {
        let sink = Arc::new(MemorySink::new());
        let filter = |logger: &str, message: String| format!("{logger}: {}", message.to_uppercase());
        let manager = Arc::new(LogManager::new(sink.clone(), Some(Arc::new(filter))));
        let logger = Logger::new("app", Level::Debug, Arc::downgrade(&manager));

        logger.info(format_args!("hello"));
        assert_eq!(sink.logs()[0].message, "app: HELLO");
    }

    #[test]
    fn test_record_stamped_with_action_id() {
        let (logger, manager, sink) = logger(Level::Debug);
        let handle = manager.begin("job").unwrap();
        logger.info(format_args!("inside"));
        manager.end(handle.clone(), crate::action::manager::Outcome::Success).unwrap();
        logger.info(format_args!("outside"));

        let logs = sink.logs();
        assert_eq!(logs[0].action_id.as_deref(), Some(handle.id()));
        assert_eq!(logs[1].action_id, None);
    }
}
