//! Action lifecycle: begin, accumulate, end.
//!
//! # Responsibilities
//! - Create action contexts and bind them to the caller
//! - Flush exactly one `ActionRecord` per action when it ends
//! - Route every emitted `LogRecord` to the sink
//!
//! # Design Decisions
//! - `end` is idempotent-safe: a second call is rejected and flushes nothing
//! - `run`, `run_async` and `ActionGuard` pair begin/end on every exit path,
//!   panics included
//! - The manager's own logger is assigned after construction, because
//!   creating a logger needs the manager

use std::future::Future;
use std::sync::{Arc, OnceLock};

use crate::action::context::ActionHandle;
use crate::action::tracker;
use crate::error::{ActionLogError, Result};
use crate::log::filter::MessageFilter;
use crate::log::logger::Logger;
use crate::log::marker::{ErrorCode, Failure};
use crate::log::record::{ActionRecord, LogRecord};
use crate::log::sink::LogSink;
use crate::observability::metrics;

/// How a unit of work terminated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure(Failure),
}

impl Outcome {
    /// Classify a failure through its `ErrorCode` capability.
    pub fn failure<E: ErrorCode + ?Sized>(err: &E) -> Self {
        Outcome::Failure(Failure::classify(err))
    }

    pub fn from_result<T, E: ErrorCode>(result: &std::result::Result<T, E>) -> Self {
        match result {
            Ok(_) => Outcome::Success,
            Err(e) => Outcome::failure(e),
        }
    }
}

/// Owns the lifecycle of action contexts.
pub struct LogManager {
    sink: Arc<dyn LogSink>,
    filter: Option<Arc<dyn MessageFilter>>,
    logger: OnceLock<Arc<Logger>>,
}

impl LogManager {
    /// Create a manager without its own logger.
    pub fn new(sink: Arc<dyn LogSink>, filter: Option<Arc<dyn MessageFilter>>) -> Self {
        Self {
            sink,
            filter,
            logger: OnceLock::new(),
        }
    }

    pub(crate) fn set_logger(&self, logger: Arc<Logger>) {
        // first assignment wins
        let _ = self.logger.set(logger);
    }

    /// Begin an action and bind it to the calling thread.
    pub fn begin(&self, action: &str) -> Result<ActionHandle> {
        let handle = ActionHandle::new(action);
        tracker::bind_thread(&handle)?;
        if let Some(logger) = self.logger.get() {
            crate::log_debug!(logger, "begin action, id={}, action={}", handle.id(), action);
        }
        Ok(handle)
    }

    /// Create an action without binding it.
    ///
    /// Bind it with [`ActionHandle::scope`] or [`ActionHandle::bind`].
    pub fn start(&self, action: &str) -> ActionHandle {
        let handle = ActionHandle::new(action);
        if let Some(logger) = self.logger.get() {
            crate::log_debug!(logger, "start action, id={}, action={}", handle.id(), action);
        }
        handle
    }

    /// End an action, flushing its record to the sink.
    pub fn end(&self, handle: ActionHandle, outcome: Outcome) -> Result<ActionRecord> {
        tracker::unbind_thread(&handle);
        if !handle.mark_ended() {
            return Err(ActionLogError::AlreadyEnded {
                id: handle.id().to_string(),
            });
        }

        let (error_code, severity) = match outcome {
            Outcome::Success => (None, None),
            Outcome::Failure(failure) => (failure.error_code, Some(failure.severity)),
        };
        let record = ActionRecord {
            id: handle.id().to_string(),
            action_name: handle.action().to_string(),
            started_at: handle.started_at(),
            elapsed: handle.elapsed(),
            stats: handle.stats(),
            error_code,
            severity,
        };

        if let Some(logger) = self.logger.get() {
            crate::log_debug!(
                logger,
                "end action, id={}, action={}, elapsed={:?}",
                record.id,
                record.action_name,
                record.elapsed
            );
        }
        self.sink.write_action(&record);
        metrics::record_action(&record);
        Ok(record)
    }

    /// Guard that ends `handle` as an unclassified failure unless finished.
    pub fn guard(&self, handle: ActionHandle) -> ActionGuard<'_> {
        ActionGuard {
            manager: self,
            handle,
            armed: true,
        }
    }

    /// Run `f` as one unit of work bound to the calling thread.
    ///
    /// The outer error reports misuse (an action is already bound); the
    /// inner result is `f`'s own, unchanged.
    pub fn run<T, E, F>(&self, action: &str, f: F) -> Result<std::result::Result<T, E>>
    where
        E: ErrorCode,
        F: FnOnce() -> std::result::Result<T, E>,
    {
        let handle = self.begin(action)?;
        let guard = self.guard(handle);
        let result = f();
        guard.finish(Outcome::from_result(&result))?;
        Ok(result)
    }

    /// Run `future` as one unit of work bound to the current task.
    pub async fn run_async<T, E, F>(&self, action: &str, future: F) -> Result<std::result::Result<T, E>>
    where
        E: ErrorCode,
        F: Future<Output = std::result::Result<T, E>>,
    {
        tracker::ensure_unbound(action)?;
        let handle = self.start(action);
        let guard = self.guard(handle.clone());
        let result = handle.scope(future).await?;
        guard.finish(Outcome::from_result(&result))?;
        Ok(result)
    }

    /// Apply the message filter, if one is installed.
    pub(crate) fn filter_message(&self, logger: &str, message: String) -> String {
        match &self.filter {
            Some(filter) => filter.filter(logger, message),
            None => message,
        }
    }

    pub(crate) fn process(&self, record: LogRecord) {
        self.sink.write_log(&record);
    }
}

impl std::fmt::Debug for LogManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogManager")
            .field("filter", &self.filter.is_some())
            .field("logger", &self.logger.get().map(|logger| logger.name()))
            .finish()
    }
}

/// Ends its action when dropped unless [`ActionGuard::finish`] was called.
#[must_use = "dropping the guard ends the action as a failure"]
pub struct ActionGuard<'a> {
    manager: &'a LogManager,
    handle: ActionHandle,
    armed: bool,
}

impl ActionGuard<'_> {
    pub fn handle(&self) -> &ActionHandle {
        &self.handle
    }

    /// End the action with `outcome`.
    pub fn finish(mut self, outcome: Outcome) -> Result<ActionRecord> {
        self.armed = false;
        self.manager.end(self.handle.clone(), outcome)
    }
}

impl Drop for ActionGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        tracing::warn!(
            id = %self.handle.id(),
            action = %self.handle.action(),
            panicking = std::thread::panicking(),
            "Action dropped before completion"
        );
        let _ = self
            .manager
            .end(self.handle.clone(), Outcome::Failure(Failure::unclassified()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::marker::{CodedError, Severity};
    use crate::log::sink::MemorySink;
    use std::time::Duration;

    fn manager() -> (LogManager, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        (LogManager::new(sink.clone(), None), sink)
    }

    #[test]
    fn test_begin_end_flushes_one_record() {
        let (manager, sink) = manager();
        let handle = manager.begin("getUser").unwrap();
        tracker::track("store", Duration::from_millis(12));
        tracker::track("store", Duration::from_millis(8));

        let record = manager.end(handle, Outcome::Success).unwrap();
        assert_eq!(record.action_name, "getUser");
        assert_eq!(record.stat("store").unwrap().count, 2);
        assert_eq!(record.stat("store").unwrap().total_elapsed, Duration::from_millis(20));
        assert!(record.error_code.is_none());
        assert_eq!(sink.actions(), vec![record]);
        assert!(tracker::current().is_none());
    }

    #[test]
    fn test_reentrant_begin_rejected() {
        let (manager, sink) = manager();
        let outer = manager.begin("outer").unwrap();

        let err = manager.begin("inner").unwrap_err();
        assert!(matches!(err, ActionLogError::AlreadyBound { .. }));
        // nested work attaches to the outer action
        tracker::track("mongoDB", Duration::from_millis(1));

        let record = manager.end(outer, Outcome::Success).unwrap();
        assert_eq!(record.stat("mongoDB").unwrap().count, 1);
        assert_eq!(sink.actions().len(), 1);
    }

    #[test]
    fn test_second_end_rejected() {
        let (manager, sink) = manager();
        let handle = manager.begin("job").unwrap();
        manager.end(handle.clone(), Outcome::Success).unwrap();

        let err = manager.end(handle.clone(), Outcome::Success).unwrap_err();
        assert_eq!(err, ActionLogError::AlreadyEnded { id: handle.id().to_string() });
        assert_eq!(sink.actions().len(), 1);
    }

    #[test]
    fn test_sequential_actions_isolated() {
        let (manager, _sink) = manager();
        let first = manager.begin("first").unwrap();
        tracker::track("mongoDB", Duration::from_millis(1));
        manager.end(first, Outcome::Success).unwrap();

        let second = manager.begin("second").unwrap();
        assert!(second.stats().is_empty());
        let record = manager.end(second, Outcome::Success).unwrap();
        assert!(record.stats.is_empty());
    }

    #[test]
    fn test_run_classifies_failure() {
        let (manager, sink) = manager();
        let result = manager
            .run("getUser", || {
                tracker::track("store", Duration::from_millis(3));
                Err::<(), _>(CodedError::warn("USER_NOT_FOUND", "user not found, id=7"))
            })
            .unwrap();

        assert!(result.is_err());
        let record = &sink.actions()[0];
        assert_eq!(record.error_code.as_deref(), Some("USER_NOT_FOUND"));
        assert_eq!(record.severity, Some(Severity::Warn));
        assert_eq!(record.stat("store").unwrap().count, 1);
    }

    #[test]
    fn test_run_flushes_on_panic() {
        let (manager, sink) = manager();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = manager.run("explode", || -> std::result::Result<(), std::io::Error> {
                tracker::track("mongoDB", Duration::from_millis(4));
                panic!("boom");
            });
        }));

        assert!(outcome.is_err());
        let actions = sink.actions();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].severity, Some(Severity::Error));
        assert_eq!(actions[0].error_code, None);
        assert_eq!(actions[0].stat("mongoDB").unwrap().count, 1);
        assert!(tracker::current().is_none());
    }

    #[tokio::test]
    async fn test_run_async_binds_task() {
        let (manager, sink) = manager();
        let result = manager
            .run_async("job", async {
                tracker::track("elasticsearch", Duration::from_millis(2));
                tokio::task::yield_now().await;
                tracker::track("elasticsearch", Duration::from_millis(2));
                Ok::<_, std::io::Error>(42)
            })
            .await
            .unwrap();

        assert_eq!(result.unwrap(), 42);
        let record = &sink.actions()[0];
        assert_eq!(record.stat("elasticsearch").unwrap().count, 2);
        assert!(!record.is_failure());
    }

    #[test]
    fn test_guard_drop_ends_action() {
        let (manager, sink) = manager();
        let handle = manager.start("job");
        {
            let _guard = manager.guard(handle.clone());
        }
        assert!(handle.is_ended());
        assert_eq!(sink.actions()[0].severity, Some(Severity::Error));
    }

    #[tokio::test]
    async fn test_nested_run_async_rejected() {
        let (manager, sink) = manager();
        let result = manager
            .run_async("outer", async {
                let nested = manager
                    .run_async("inner", async { Ok::<_, std::io::Error>(()) })
                    .await;
                assert!(matches!(nested, Err(ActionLogError::AlreadyBound { .. })));
                tracker::track("mongoDB", Duration::from_millis(1));
                Ok::<_, std::io::Error>(())
            })
            .await
            .unwrap();

        assert!(result.is_ok());
        let actions = sink.actions();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].action_name, "outer");
        assert_eq!(actions[0].stat("mongoDB").unwrap().count, 1);
    }
}
