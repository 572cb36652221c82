//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ActionLogConfig (validated, immutable)
//!     → LoggerFactory::from_config, client thresholds, server bind
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup; loggers resolve their level at creation
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    ActionLogConfig, LogConfig, LogFormat, ObservabilityConfig, SearchConfig, ServerConfig,
    StoreConfig,
};
pub use validation::ValidationError;
