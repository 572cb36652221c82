//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::ActionLogConfig;
use crate::config::validation::{validate_config, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ActionLogConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ActionLogConfig, ConfigError> {
    let config: ActionLogConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogFormat;
    use crate::log::Level;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.log.default_level, Level::Debug);
        assert_eq!(config.store.too_many_rows_returned_threshold, 2_000);
        assert_eq!(config.server.bind_address, "0.0.0.0:8080");
        assert!(!config.observability.metrics_enabled);
    }

    #[test]
    fn test_full_config() {
        let config = parse_config(
            r#"
            [log]
            default_level = "info"
            format = "json"
            redact_keys = ["password"]

            [[log.trace_levels]]
            prefix = "mongodb"
            level = "WARN"

            [store]
            slow_operation_threshold_ms = 250
            too_many_rows_returned_threshold = 50

            [search]
            slow_query_threshold_ms = 100
            "#,
        )
        .unwrap();

        assert_eq!(config.log.default_level, Level::Info);
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.log.trace_levels.len(), 1);
        assert_eq!(config.log.trace_levels[0].level, Level::Warn);
        assert_eq!(config.store.slow_operation_threshold().as_millis(), 250);
        assert_eq!(config.search.slow_query_threshold().as_millis(), 100);
    }

    #[test]
    fn test_parse_error() {
        let err = parse_config("[log]\ndefault_level = \"loud\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validation_error() {
        let err = parse_config("[store]\nslow_operation_threshold_ms = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref errors) if errors.len() == 1));
        assert!(err.to_string().starts_with("Validation failed: "));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/action-log.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
