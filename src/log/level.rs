//! Log levels and per-logger trace level resolution.
//!
//! # Responsibilities
//! - Order levels from TRACE to ERROR
//! - Resolve a logger name to its effective level via ordered prefix rules
//!
//! # Design Decisions
//! - First matching prefix wins, so specific rules go before broad ones
//! - Rules are immutable once the resolver is built
//! - Noisy dependency namespaces default to INFO

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Verbosity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    #[serde(alias = "trace")]
    Trace,
    #[serde(alias = "debug")]
    Debug,
    #[serde(alias = "info")]
    Info,
    #[serde(alias = "warn", alias = "warning")]
    Warn,
    #[serde(alias = "error")]
    Error,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognized level name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown log level: {0}")]
pub struct ParseLevelError(pub String);

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(Level::Trace),
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

/// A single `prefix -> level` rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceLevelRule {
    /// Logger name prefix to match.
    pub prefix: String,
    /// Level applied to matching loggers.
    pub level: Level,
}

impl TraceLevelRule {
    pub fn new(prefix: impl Into<String>, level: Level) -> Self {
        Self {
            prefix: prefix.into(),
            level,
        }
    }
}

/// Prefixes of chatty dependency loggers that only log at INFO and above.
pub const QUIET_PREFIXES: [&str; 4] = ["mongodb", "elasticsearch", "hyper", "h2"];

/// Maps a logger name to its effective level.
#[derive(Debug, Clone)]
pub struct TraceLevelResolver {
    rules: Vec<TraceLevelRule>,
    default_level: Level,
}

impl TraceLevelResolver {
    /// Build a resolver from ordered rules and a fallback level.
    pub fn new(rules: Vec<TraceLevelRule>, default_level: Level) -> Self {
        Self {
            rules,
            default_level,
        }
    }

    /// Resolve the effective level for `logger_name`.
    pub fn resolve(&self, logger_name: &str) -> Level {
        self.rules
            .iter()
            .find(|rule| logger_name.starts_with(&rule.prefix))
            .map(|rule| rule.level)
            .unwrap_or(self.default_level)
    }

    pub fn default_level(&self) -> Level {
        self.default_level
    }

    pub fn rules(&self) -> &[TraceLevelRule] {
        &self.rules
    }
}

impl Default for TraceLevelResolver {
    fn default() -> Self {
        let rules = QUIET_PREFIXES
            .iter()
            .map(|prefix| TraceLevelRule::new(*prefix, Level::Info))
            .collect();
        Self::new(rules, Level::Debug)
    }
}
