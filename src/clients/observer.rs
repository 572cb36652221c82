//! Slow operation detection shared by downstream clients.
//!
//! # Responsibilities
//! - Time an operation, success or failure
//! - Report the elapsed time to the bound action under a dependency kind
//! - Warn with a stable error code when a threshold is exceeded
//!
//! # Design Decisions
//! - Timing and tracking run from a drop guard, so they also happen when
//!   the operation returns early or panics
//! - Strict greater-than: elapsed equal to the threshold is not slow
//! - Observational only; results pass through untouched

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::action::tracker;
use crate::log::logger::Logger;
use crate::log::marker::Marker;
use crate::log::Level;
use crate::observability::metrics;

/// Measures wall time since creation.
#[derive(Debug, Clone, Copy)]
pub struct StopWatch {
    start: Instant,
}

impl StopWatch {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Timing and slow-operation check for one client family.
#[derive(Debug, Clone)]
pub struct ThresholdObserver {
    logger: Arc<Logger>,
    dependency_kind: Cow<'static, str>,
    threshold: Duration,
    marker: Marker,
    label: Cow<'static, str>,
}

impl ThresholdObserver {
    /// `label` prefixes the warning, e.g. "slow mongoDB query".
    pub fn new(
        logger: Arc<Logger>,
        dependency_kind: impl Into<Cow<'static, str>>,
        threshold: Duration,
        error_code: impl Into<Cow<'static, str>>,
        label: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            logger,
            dependency_kind: dependency_kind.into(),
            threshold,
            marker: Marker::error_code(error_code),
            label: label.into(),
        }
    }

    pub fn dependency_kind(&self) -> &str {
        &self.dependency_kind
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    pub fn logger(&self) -> &Arc<Logger> {
        &self.logger
    }

    /// Run `f`, then track, log and check however it finished.
    ///
    /// `describe` renders the debug line and is only called when debug
    /// logging is enabled for the client's logger.
    pub fn observe<T, D, F>(&self, describe: D, f: F) -> T
    where
        D: FnOnce() -> String,
        F: FnOnce() -> T,
    {
        let _timer = OperationTimer::new(self, describe);
        f()
    }

    pub async fn observe_async<T, D, F>(&self, describe: D, future: F) -> T
    where
        D: FnOnce() -> String,
        F: Future<Output = T>,
    {
        let _timer = OperationTimer::new(self, describe);
        future.await
    }

    /// Record a finished operation. Returns true if it was slow.
    pub fn record(&self, elapsed: Duration, describe: impl FnOnce() -> String) -> bool {
        tracker::track(&self.dependency_kind, elapsed);
        if self.logger.is_enabled(Level::Debug) {
            crate::log_debug!(self.logger, "{}, elapsed={:?}", describe(), elapsed);
        }
        self.check(elapsed)
    }

    /// Warn once if `elapsed` exceeds the threshold.
    pub fn check(&self, elapsed: Duration) -> bool {
        if elapsed <= self.threshold {
            return false;
        }
        crate::log_warn!(self.logger, marker: &self.marker, "{}, elapsed={:?}", self.label, elapsed);
        metrics::record_slow_operation(&self.dependency_kind, self.marker.code());
        true
    }
}

struct OperationTimer<'a, D: FnOnce() -> String> {
    observer: &'a ThresholdObserver,
    watch: StopWatch,
    describe: Option<D>,
}

impl<'a, D: FnOnce() -> String> OperationTimer<'a, D> {
    fn new(observer: &'a ThresholdObserver, describe: D) -> Self {
        Self {
            observer,
            watch: StopWatch::start(),
            describe: Some(describe),
        }
    }
}

impl<D: FnOnce() -> String> Drop for OperationTimer<'_, D> {
    fn drop(&mut self) {
        let elapsed = self.watch.elapsed();
        let describe = self.describe.take();
        self.observer
            .record(elapsed, || describe.map(|d| d()).unwrap_or_default());
    }
}

/// Warns when a query returns more rows than expected.
#[derive(Debug, Clone)]
pub struct RowCountCheck {
    logger: Arc<Logger>,
    threshold: usize,
    marker: Marker,
}

impl RowCountCheck {
    pub fn new(logger: Arc<Logger>, threshold: usize, error_code: impl Into<Cow<'static, str>>) -> Self {
        Self {
            logger,
            threshold,
            marker: Marker::error_code(error_code),
        }
    }

    /// Returns true if `returned` exceeded the threshold.
    pub fn check(&self, returned: usize) -> bool {
        if returned <= self.threshold {
            return false;
        }
        crate::log_warn!(self.logger, marker: &self.marker, "too many rows returned, returnedRows={}", returned);
        true
    }
}
