//! Ambient access to the action bound to the caller.
//!
//! # Responsibilities
//! - Bind a handle to the current thread or async task
//! - Let downstream wrappers `track` into whatever action is bound
//!
//! # Design Decisions
//! - Task-local binding is consulted first, then the thread-local one, so
//!   tasks sharing a worker thread never see each other's action
//! - Tracking with nothing bound is a silent no-op (startup checks,
//!   health checks)
//! - In async code bind with `ActionHandle::scope`; a thread binding does
//!   not follow a task across `.await` points
//! - An ended handle counts as unbound, so ending an action on another
//!   thread does not leave the original thread stuck on it

use std::cell::RefCell;
use std::future::Future;
use std::marker::PhantomData;
use std::time::Duration;

use crate::action::context::ActionHandle;
use crate::error::{ActionLogError, Result};

thread_local! {
    static CURRENT: RefCell<Option<ActionHandle>> = const { RefCell::new(None) };
}

tokio::task_local! {
    static TASK_ACTION: ActionHandle;
}

/// The action bound to the calling task or thread.
///
/// Ended actions are skipped; a stale thread binding is cleared.
pub fn current() -> Option<ActionHandle> {
    TASK_ACTION
        .try_with(ActionHandle::clone)
        .ok()
        .filter(|handle| !handle.is_ended())
        .or_else(|| {
            CURRENT.with(|current| {
                let mut current = current.borrow_mut();
                if current.as_ref().is_some_and(ActionHandle::is_ended) {
                    *current = None;
                }
                current.clone()
            })
        })
}

/// Correlation id of the bound action.
pub fn id() -> Option<String> {
    current().map(|handle| handle.id().to_string())
}

/// Add `elapsed` under `key` to the bound action, if any.
pub fn track(key: &str, elapsed: Duration) {
    if let Some(handle) = current() {
        handle.track(key, elapsed);
    }
}

pub(crate) fn ensure_unbound(requested: &str) -> Result<()> {
    match current() {
        Some(current) => Err(ActionLogError::AlreadyBound {
            current: current.action().to_string(),
            requested: requested.to_string(),
        }),
        None => Ok(()),
    }
}

pub(crate) fn bind_thread(handle: &ActionHandle) -> Result<()> {
    ensure_unbound(handle.action())?;
    CURRENT.with(|current| *current.borrow_mut() = Some(handle.clone()));
    Ok(())
}

/// Clear the thread binding if it holds `handle`.
pub(crate) fn unbind_thread(handle: &ActionHandle) -> bool {
    CURRENT.with(|current| {
        let mut current = current.borrow_mut();
        match current.as_ref() {
            Some(bound) if bound.same_context(handle) => {
                *current = None;
                true
            }
            _ => false,
        }
    })
}

/// Keeps a handle bound to the current thread until dropped.
#[must_use = "the action is unbound as soon as the guard is dropped"]
#[derive(Debug)]
pub struct BindGuard {
    handle: ActionHandle,
    // thread bound: must be dropped on the thread that created it
    _not_send: PhantomData<*const ()>,
}

impl Drop for BindGuard {
    fn drop(&mut self) {
        unbind_thread(&self.handle);
    }
}

impl ActionHandle {
    /// Bind this action to the calling thread, e.g. after handing the unit
    /// of work to another thread.
    pub fn bind(&self) -> Result<BindGuard> {
        bind_thread(self)?;
        Ok(BindGuard {
            handle: self.clone(),
            _not_send: PhantomData,
        })
    }

    /// Run `future` with this action bound to the current task.
    ///
    /// Fails without polling `future` if another action is already bound.
    pub async fn scope<F: Future>(&self, future: F) -> Result<F::Output> {
        ensure_unbound(self.action())?;
        Ok(TASK_ACTION.scope(self.clone(), future).await)
    }

    /// Run `f` with this action bound to the current task, synchronously.
    pub fn sync_scope<R>(&self, f: impl FnOnce() -> R) -> Result<R> {
        ensure_unbound(self.action())?;
        Ok(TASK_ACTION.sync_scope(self.clone(), f))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_without_binding_is_noop() {
        assert!(current().is_none());
        track("mongoDB", Duration::from_millis(5));
        assert!(current().is_none());
        assert!(id().is_none());
    }

    #[test]
    fn test_bind_guard_unbinds_on_drop() {
        let handle = ActionHandle::new("job");
        {
            let _guard = handle.bind().unwrap();
            track("mongoDB", Duration::from_millis(5));
            assert_eq!(id().as_deref(), Some(handle.id()));
        }
        assert!(current().is_none());
        assert_eq!(handle.stats()["mongoDB"].count, 1);
    }

    #[test]
    fn test_double_bind_rejected() {
        let first = ActionHandle::new("first");
        let second = ActionHandle::new("second");
        let _guard = first.bind().unwrap();

        let err = second.bind().unwrap_err();
        assert_eq!(
            err,
            ActionLogError::AlreadyBound {
                current: "first".into(),
                requested: "second".into(),
            }
        );
    }

    #[test]
    fn test_rebind_on_other_thread() {
        let handle = ActionHandle::new("job");
        let moved = handle.clone();
        std::thread::spawn(move || {
            let _guard = moved.bind().unwrap();
            track("elasticsearch", Duration::from_millis(2));
        })
        .join()
        .unwrap();

        assert_eq!(handle.stats()["elasticsearch"].count, 1);
        assert!(current().is_none());
    }

    #[tokio::test]
    async fn test_task_scope_isolates_concurrent_tasks() {
        let a = ActionHandle::new("a");
        let b = ActionHandle::new("b");

        let task_a = tokio::spawn({
            let a = a.clone();
            async move {
                a.scope(async {
                    for _ in 0..3 {
                        track("mongoDB", Duration::from_millis(1));
                        tokio::task::yield_now().await;
                    }
                })
                .await
                .unwrap()
            }
        });
        let task_b = tokio::spawn({
            let b = b.clone();
            async move {
                b.scope(async {
                    track("mongoDB", Duration::from_millis(1));
                    tokio::task::yield_now().await;
                })
                .await
                .unwrap()
            }
        });
        task_a.await.unwrap();
        task_b.await.unwrap();

        assert_eq!(a.stats()["mongoDB"].count, 3);
        assert_eq!(b.stats()["mongoDB"].count, 1);
    }

    #[test]
    fn test_sync_scope() {
        let handle = ActionHandle::new("job");
        handle
            .sync_scope(|| track("store", Duration::from_millis(1)))
            .unwrap();
        assert_eq!(handle.stats()["store"].count, 1);
        assert!(current().is_none());
    }

    #[tokio::test]
    async fn test_nested_scope_rejected() {
        let outer = ActionHandle::new("outer");
        let inner = ActionHandle::new("inner");

        let nested = outer
            .scope(async {
                let result = inner
                    .scope(async { track("mongoDB", Duration::from_millis(1)) })
                    .await;
                track("mongoDB", Duration::from_millis(1));
                result
            })
            .await
            .unwrap();

        assert_eq!(
            nested,
            Err(ActionLogError::AlreadyBound {
                current: "outer".into(),
                requested: "inner".into(),
            })
        );
        assert_eq!(outer.stats()["mongoDB"].count, 1);
        assert!(inner.stats().is_empty());
    }

    #[test]
    fn test_sync_scope_rejected_under_thread_binding() {
        let outer = ActionHandle::new("outer");
        let _guard = outer.bind().unwrap();

        let inner = ActionHandle::new("inner");
        assert!(inner.sync_scope(|| ()).is_err());
        assert!(current().unwrap().same_context(&outer));
    }

    #[test]
    fn test_ended_thread_binding_cleared() {
        let handle = ActionHandle::new("job");
        bind_thread(&handle).unwrap();
        assert!(handle.mark_ended());

        assert!(current().is_none());
        track("mongoDB", Duration::from_millis(1));
        assert!(handle.stats().is_empty());

        let next = ActionHandle::new("next");
        let _guard = next.bind().unwrap();
        assert!(current().unwrap().same_context(&next));
    }
}
