//! HTTP unit-of-work subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, TraceLayer)
//!     → middleware.rs (start action "METHOD /route", bind to task)
//!     → handler (store / search calls tracked into the action)
//!     → middleware.rs (classify response, x-action-id, flush record)
//!     → Send to client
//! ```

pub mod middleware;
pub mod server;

pub use middleware::{action_log_middleware, X_ACTION_ID};
pub use server::{build_router, AppError, AppState, HttpServer};
