//! Memoized logger construction.
//!
//! # Responsibilities
//! - Hand out one `Logger` per distinct name
//! - Own the `LogManager` every logger reports to
//!
//! # Design Decisions
//! - `DashMap::entry` creates at most one logger per name under concurrent
//!   first access
//! - Two-phase bootstrap: the manager is built logger-less, then given a
//!   logger obtained from this factory

use dashmap::DashMap;
use std::sync::Arc;

use crate::action::manager::LogManager;
use crate::config::LogConfig;
use crate::log::filter::{MessageFilter, RedactFilter};
use crate::log::level::TraceLevelResolver;
use crate::log::logger::Logger;
use crate::log::sink::{LogSink, TracingSink};

/// Logger name used by the manager itself.
pub const LOG_MANAGER_LOGGER: &str = "action_log::action::manager";

pub struct LoggerFactory {
    manager: Arc<LogManager>,
    resolver: TraceLevelResolver,
    loggers: DashMap<String, Arc<Logger>>,
}

impl LoggerFactory {
    pub fn new(
        resolver: TraceLevelResolver,
        sink: Arc<dyn LogSink>,
        filter: Option<Arc<dyn MessageFilter>>,
    ) -> Self {
        let factory = Self {
            manager: Arc::new(LogManager::new(sink, filter)),
            resolver,
            loggers: DashMap::new(),
        };
        // creating a logger requires the manager, so the manager gets its logger last
        factory
            .manager
            .set_logger(factory.get_logger(LOG_MANAGER_LOGGER));
        factory
    }

    /// Build from configuration, writing to `sink`.
    pub fn from_config(config: &LogConfig, sink: Arc<dyn LogSink>) -> Self {
        let resolver = TraceLevelResolver::new(config.trace_levels.clone(), config.default_level);
        let filter = RedactFilter::new(config.redact_keys.as_slice())
            .map(|filter| Arc::new(filter) as Arc<dyn MessageFilter>);
        Self::new(resolver, sink, filter)
    }

    /// The logger for `name`, created on first use.
    pub fn get_logger(&self, name: &str) -> Arc<Logger> {
        if let Some(logger) = self.loggers.get(name) {
            return logger.value().clone();
        }
        self.loggers
            .entry(name.to_string())
            .or_insert_with(|| {
                Arc::new(Logger::new(
                    name,
                    self.resolver.resolve(name),
                    Arc::downgrade(&self.manager),
                ))
            })
            .value()
            .clone()
    }

    pub fn manager(&self) -> &Arc<LogManager> {
        &self.manager
    }

    pub fn resolver(&self) -> &TraceLevelResolver {
        &self.resolver
    }

    /// Number of distinct loggers created so far.
    pub fn logger_count(&self) -> usize {
        self.loggers.len()
    }
}

impl Default for LoggerFactory {
    fn default() -> Self {
        Self::new(TraceLevelResolver::default(), Arc::new(TracingSink), None)
    }
}

impl std::fmt::Debug for LoggerFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggerFactory")
            .field("manager", &self.manager)
            .field("loggers", &self.loggers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::level::{Level, TraceLevelRule};
    use crate::log::sink::MemorySink;
    use std::sync::Barrier;

    fn factory() -> (LoggerFactory, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let resolver = TraceLevelResolver::new(
            vec![TraceLevelRule::new("org.mongodb", Level::Info)],
            Level::Debug,
        );
        (LoggerFactory::new(resolver, sink.clone(), None), sink)
    }

    #[test]
    fn test_same_name_same_instance() {
        let (factory, _sink) = factory();
        let a = factory.get_logger("X");
        let b = factory.get_logger("X");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &factory.get_logger("Y")));
    }

    #[test]
    fn test_concurrent_first_access_single_instance() {
        let (factory, _sink) = factory();
        let factory = Arc::new(factory);
        let barrier = Arc::new(Barrier::new(8));
        let before = factory.logger_count();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let factory = factory.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    factory.get_logger("app::concurrent")
                })
            })
            .collect();
        let loggers: Vec<Arc<Logger>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(loggers.iter().all(|logger| Arc::ptr_eq(logger, &loggers[0])));
        assert_eq!(factory.logger_count(), before + 1);
    }

    #[test]
    fn test_levels_resolved_from_rules() {
        let (factory, _sink) = factory();
        assert_eq!(factory.get_logger("org.mongodb.driver").level(), Level::Info);
        assert_eq!(factory.get_logger("app.service").level(), Level::Debug);
    }

    #[test]
    fn test_manager_logger_assigned() {
        let (factory, sink) = factory();
        let handle = factory.manager().begin("job").unwrap();
        factory
            .manager()
            .end(handle, crate::action::manager::Outcome::Success)
            .unwrap();

        let logs = sink.logs();
        assert!(logs.iter().all(|record| record.logger == LOG_MANAGER_LOGGER));
        assert!(logs.iter().any(|record| record.message.starts_with("begin action")));
        assert!(logs.iter().any(|record| record.message.starts_with("end action")));
    }
}
