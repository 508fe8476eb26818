//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, ports valid)
//! - Check addresses and signal names resolve
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ControlConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::ControlConfig;
use crate::sync::notify::signal_from_name;

/// A single semantic problem, naming the offending field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &ControlConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.api.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "api.bind_address",
            format!("not a socket address: {:?}", config.api.bind_address),
        ));
    }
    if config.api.request_timeout_secs == 0 {
        errors.push(ValidationError::new("api.request_timeout_secs", "must be > 0"));
    }

    let paths = &config.paths;
    let documents = [
        ("paths.discovery", &paths.discovery),
        ("paths.runtime", &paths.runtime),
        ("paths.published", &paths.published),
        ("paths.pid_file", &paths.pid_file),
    ];
    for (field, path) in documents {
        if path.as_os_str().is_empty() {
            errors.push(ValidationError::new(field, "must not be empty"));
        }
    }
    for (i, (field, path)) in documents.iter().enumerate() {
        if let Some((other, _)) = documents[..i].iter().find(|(_, p)| *p == *path) {
            errors.push(ValidationError::new(*field, format!("same file as {}", other)));
        }
    }

    if config.publish.listen_port == 0 {
        errors.push(ValidationError::new("publish.listen_port", "must be > 0"));
    }
    if config.publish.algorithm.trim().is_empty() {
        errors.push(ValidationError::new("publish.algorithm", "must not be empty"));
    }

    if config.sync.poll_interval_secs == 0 {
        errors.push(ValidationError::new("sync.poll_interval_secs", "must be > 0"));
    }
    if signal_from_name(&config.sync.reload_signal).is_none() {
        errors.push(ValidationError::new(
            "sync.reload_signal",
            format!("unknown signal {:?}", config.sync.reload_signal),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("not a socket address: {:?}", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(validate_config(&ControlConfig::default()), Ok(()));
    }

    #[test]
    fn test_all_errors_collected() {
        let mut config = ControlConfig::default();
        config.api.bind_address = "not-an-address".into();
        config.publish.listen_port = 0;
        config.sync.poll_interval_secs = 0;
        config.sync.reload_signal = "SIGBOGUS".into();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "api.bind_address",
                "publish.listen_port",
                "sync.poll_interval_secs",
                "sync.reload_signal"
            ]
        );
    }

    #[test]
    fn test_documents_must_be_distinct() {
        let mut config = ControlConfig::default();
        config.paths.published = PathBuf::from("data/backends_runtime.json");
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "paths.published");
        assert!(errors[0].message.contains("paths.runtime"));
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = ControlConfig::default();
        config.observability.metrics_address = "nope".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
