//! Instrumented downstream clients.
//!
//! # Data Flow
//! ```text
//! business logic
//!     → Collection / SearchType operation
//!     → observer.rs (StopWatch, run backend call)
//!     → on completion: tracker::track(kind), debug record, threshold check
//!     → result returned unchanged
//! ```
//!
//! # Design Decisions
//! - One shared `ThresholdObserver` instead of a copy per client family
//! - Backends are traits so real drivers can replace the in-memory ones

pub mod observer;
pub mod search;
pub mod store;

pub use observer::{RowCountCheck, StopWatch, ThresholdObserver};
pub use search::{MemorySearch, SearchBackend, SearchError, SearchRequest, SearchResponse, SearchType, Searchable};
pub use store::{Collection, Document, Filter, MemoryStore, StoreBackend, StoreError};
