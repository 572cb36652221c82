//! Message filtering applied before a record leaves the process.
//!
//! # Responsibilities
//! - Define the single-method `MessageFilter` capability
//! - Provide a key redaction filter for secrets in `key=value` messages
//!
//! # Design Decisions
//! - Closures are filters too, so tests and apps can inject one inline
//! - Installed once at startup, read-only afterwards

use regex::Regex;

/// Transform applied to `(logger name, message)` before emission.
pub trait MessageFilter: Send + Sync {
    fn filter(&self, logger: &str, message: String) -> String;
}

impl<F> MessageFilter for F
where
    F: Fn(&str, String) -> String + Send + Sync,
{
    fn filter(&self, logger: &str, message: String) -> String {
        self(logger, message)
    }
}

/// Replaces the value of sensitive `key=value` pairs with a mask.
#[derive(Debug, Clone)]
pub struct RedactFilter {
    pattern: Regex,
}

const MASK: &str = "******";

impl RedactFilter {
    /// Build a filter masking the given keys (matched case-insensitively).
    ///
    /// Returns `None` when `keys` is empty.
    pub fn new<S: AsRef<str>>(keys: &[S]) -> Option<Self> {
        if keys.is_empty() {
            return None;
        }
        let alternatives = keys
            .iter()
            .map(|key| regex::escape(key.as_ref()))
            .collect::<Vec<_>>()
            .join("|");
        // keys are escaped, so the pattern is always valid
        let pattern = Regex::new(&format!(r"(?i)\b({alternatives})=([^,\s&]+)")).ok()?;
        Some(Self { pattern })
    }
}

impl MessageFilter for RedactFilter {
    fn filter(&self, _logger: &str, message: String) -> String {
        if !self.pattern.is_match(&message) {
            return message;
        }
        self.pattern
            .replace_all(&message, format!("${{1}}={MASK}").as_str())
            .into_owned()
    }
}
