//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (thresholds > 0, addresses parse)
//! - Detect trace level rules that can never match
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::ActionLogConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &ActionLogConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let rules = &config.log.trace_levels;
    for (i, rule) in rules.iter().enumerate() {
        let field = format!("log.trace_levels[{i}].prefix");
        if rule.prefix.is_empty() {
            errors.push(ValidationError::new(field, "must not be empty"));
            continue;
        }
        // first match wins, so a later rule under an earlier prefix is dead
        if let Some(earlier) = rules[..i]
            .iter()
            .find(|earlier| !earlier.prefix.is_empty() && rule.prefix.starts_with(&earlier.prefix))
        {
            errors.push(ValidationError::new(
                field,
                format!("unreachable, shadowed by earlier prefix '{}'", earlier.prefix),
            ));
        }
    }

    for (i, key) in config.log.redact_keys.iter().enumerate() {
        if key.trim().is_empty() {
            errors.push(ValidationError::new(
                format!("log.redact_keys[{i}]"),
                "must not be empty",
            ));
        }
    }

    if config.store.slow_operation_threshold_ms == 0 {
        errors.push(ValidationError::new(
            "store.slow_operation_threshold_ms",
            "must be greater than 0",
        ));
    }
    if config.store.too_many_rows_returned_threshold == 0 {
        errors.push(ValidationError::new(
            "store.too_many_rows_returned_threshold",
            "must be greater than 0",
        ));
    }
    if config.search.slow_query_threshold_ms == 0 {
        errors.push(ValidationError::new(
            "search.slow_query_threshold_ms",
            "must be greater than 0",
        ));
    }

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "server.bind_address",
            format!("invalid socket address '{}'", config.server.bind_address),
        ));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!(
                "invalid socket address '{}'",
                config.observability.metrics_address
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
