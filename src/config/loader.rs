//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ControlConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
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
pub fn load_config(path: &Path) -> Result<ControlConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ControlConfig, ConfigError> {
    let config: ControlConfig = toml::from_str(content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{LogFormat, WatchMode};

    #[test]
    fn test_empty_file_is_all_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.sync.poll_interval_secs, 2);
        assert_eq!(config.sync.runtime_ttl_secs, 15);
        assert_eq!(config.publish.listen_port, 10080);
        assert_eq!(config.sync.watch_mode, WatchMode::Poll);
    }

    #[test]
    fn test_partial_sections_override() {
        let config = parse_config(
            r#"
            [paths]
            base_dir = "/srv/control"
            discovery = "in/discovery.json"

            [sync]
            runtime_ttl_secs = 0
            watch_mode = "events"

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.paths.base_dir, Path::new("/srv/control"));
        assert_eq!(config.paths.discovery, Path::new("in/discovery.json"));
        assert_eq!(config.paths.runtime, Path::new("data/backends_runtime.json"));
        assert_eq!(config.sync.runtime_ttl_secs, 0);
        assert_eq!(config.sync.watch_mode, WatchMode::Events);
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }

    #[test]
    fn test_semantic_errors_are_reported() {
        let err = parse_config(
            r#"
            [sync]
            poll_interval_secs = 0
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("poll_interval_secs"));
    }

    #[test]
    fn test_syntax_errors_are_parse_errors() {
        let err = parse_config("[sync\npoll_interval_secs = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("control.toml");
        std::fs::write(&path, "[publish]\nalgorithm = \"least_conn\"\n").unwrap();
        assert_eq!(load_config(&path).unwrap().publish.algorithm, "least_conn");

        let missing = load_config(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io(_)));
    }
}
