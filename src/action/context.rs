//! Per unit-of-work context and its passable handle.
//!
//! # Responsibilities
//! - Generate the correlation id and remember when the action started
//! - Aggregate `count` / `total_elapsed` per dependency kind
//! - Remember whether the action was already ended
//!
//! # Design Decisions
//! - The handle is an `Arc`, so a dispatcher can move it to another thread
//!   or task and rebind it explicitly
//! - Stats live behind a `Mutex`; under correct usage it is never contended

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::log::record::ActionStat;

struct ActionContext {
    id: String,
    action: String,
    start_time: Instant,
    started_at: DateTime<Utc>,
    stats: Mutex<BTreeMap<String, ActionStat>>,
    ended: AtomicBool,
}

/// Handle to one action context.
///
/// Clones refer to the same context.
#[derive(Clone)]
pub struct ActionHandle {
    inner: Arc<ActionContext>,
}

impl ActionHandle {
    pub(crate) fn new(action: &str) -> Self {
        Self {
            inner: Arc::new(ActionContext {
                id: Uuid::new_v4().to_string(),
                action: action.to_string(),
                start_time: Instant::now(),
                started_at: Utc::now(),
                stats: Mutex::new(BTreeMap::new()),
                ended: AtomicBool::new(false),
            }),
        }
    }

    /// Correlation id of the action.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Name of the unit of work.
    pub fn action(&self) -> &str {
        &self.inner.action
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.inner.started_at
    }

    /// Time since the action began.
    pub fn elapsed(&self) -> Duration {
        self.inner.start_time.elapsed()
    }

    /// Add one call of `elapsed` under `key`. Ignored once the action ended.
    pub fn track(&self, key: &str, elapsed: Duration) {
        let mut stats = self.inner.stats.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_ended() {
            return;
        }
        match stats.get_mut(key) {
            Some(stat) => stat.add(elapsed),
            None => {
                let mut stat = ActionStat::default();
                stat.add(elapsed);
                stats.insert(key.to_string(), stat);
            }
        }
    }

    /// Snapshot of the stats, sorted by key.
    pub fn stats(&self) -> BTreeMap<String, ActionStat> {
        self.inner
            .stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_ended(&self) -> bool {
        self.inner.ended.load(Ordering::Acquire)
    }

    /// Returns true only for the first caller.
    pub(crate) fn mark_ended(&self) -> bool {
        !self.inner.ended.swap(true, Ordering::AcqRel)
    }

    /// True when both handles refer to the same context.
    pub fn same_context(&self, other: &ActionHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for ActionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionHandle")
            .field("id", &self.inner.id)
            .field("action", &self.inner.action)
            .field("ended", &self.is_ended())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_aggregates_per_key() {
        let handle = ActionHandle::new("job");
        handle.track("mongoDB", Duration::from_millis(3));
        handle.track("mongoDB", Duration::from_millis(4));
        handle.track("elasticsearch", Duration::from_millis(10));

        let stats = handle.stats();
        assert_eq!(stats["mongoDB"].count, 2);
        assert_eq!(stats["mongoDB"].total_elapsed, Duration::from_millis(7));
        assert_eq!(stats["elasticsearch"].count, 1);
        let keys: Vec<&String> = stats.keys().collect();
        assert_eq!(keys, ["elasticsearch", "mongoDB"]);
    }

    #[test]
    fn test_ids_are_unique() {
        let a = ActionHandle::new("a");
        let b = ActionHandle::new("a");
        assert_ne!(a.id(), b.id());
        assert!(!a.same_context(&b));
        assert!(a.same_context(&a.clone()));
    }

    #[test]
    fn test_mark_ended_once() {
        let handle = ActionHandle::new("a");
        assert!(handle.mark_ended());
        assert!(!handle.clone().mark_ended());
        assert!(handle.is_ended());
    }

    #[test]
    fn test_track_after_end_ignored() {
        let handle = ActionHandle::new("job");
        handle.track("mongoDB", Duration::from_millis(1));
        assert!(handle.mark_ended());

        handle.clone().track("mongoDB", Duration::from_millis(5));
        handle.track("elasticsearch", Duration::from_millis(5));

        let stats = handle.stats();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats["mongoDB"].count, 1);
        assert_eq!(stats["mongoDB"].total_elapsed, Duration::from_millis(1));
    }
}
