//! Action context subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher (HTTP handler, job runner, message handler)
//!     → manager.rs begin/start (create context.rs, bind via tracker.rs)
//!     → business logic
//!         → downstream wrapper → tracker::track(kind, elapsed)
//!     → manager.rs end (unbind, flush one ActionRecord)
//! ```
//!
//! # Design Decisions
//! - One action per thread or task at a time; nested units of work attach
//!   to the outer action
//! - The handle is a plain value so work can be moved and rebound
//! - Stats are only ever added to, never reset, within an action

pub mod context;
pub mod manager;
pub mod tracker;

pub use context::ActionHandle;
pub use manager::{ActionGuard, LogManager, Outcome};
pub use tracker::{current, track, BindGuard};
