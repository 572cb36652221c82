//! Crate-level error type.

use thiserror::Error;

/// Errors raised by the action log core.
///
/// These are programming errors at the unit-of-work boundary; they are
/// surfaced immediately instead of silently nesting or double-flushing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActionLogError {
    /// `begin` was called while another action is bound to this thread or task.
    #[error("action already bound, current={current}, requested={requested}")]
    AlreadyBound { current: String, requested: String },

    /// `end` was called twice for the same action.
    #[error("action already ended, id={id}")]
    AlreadyEnded { id: String },

    /// The process-wide logger factory was installed twice.
    #[error("logger factory already initialized")]
    FactoryInitialized,
}

pub type Result<T> = std::result::Result<T, ActionLogError>;
