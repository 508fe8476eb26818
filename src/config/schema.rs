//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the control
//! plane. All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the control plane.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ControlConfig {
    /// HTTP API settings.
    pub api: ApiConfig,

    /// Locations of every document the engine reads or writes.
    pub paths: PathsConfig,

    /// Values rendered into the published configuration.
    pub publish: PublishConfig,

    /// Change detection, TTL and reload behaviour.
    pub sync: SyncConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// HTTP API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Bearer token required on every request. Empty disables auth.
    pub api_key: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            api_key: String::new(),
            request_timeout_secs: 10,
        }
    }
}

/// Document locations. Relative paths resolve against `base_dir`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    pub base_dir: PathBuf,

    /// Discovery snapshot, written by the external discovery actor.
    pub discovery: PathBuf,

    /// Runtime registry, owned by this engine.
    pub runtime: PathBuf,

    /// Published configuration read by the routing process.
    pub published: PathBuf,

    /// PID file of the routing process.
    pub pid_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            discovery: PathBuf::from("data/k8s_endpoints.json"),
            runtime: PathBuf::from("data/backends_runtime.json"),
            published: PathBuf::from("config/proxy_config.json"),
            pid_file: PathBuf::from("../run/proxy.pid"),
        }
    }
}

/// Static values copied into every published document.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PublishConfig {
    /// Host the routing process should listen on.
    pub listen_host: String,

    /// Port the routing process should listen on.
    pub listen_port: u16,

    /// Load balancing algorithm name understood by the routing process.
    pub algorithm: String,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            listen_host: "0.0.0.0".to_string(),
            listen_port: 10080,
            algorithm: "weighted_round_robin".to_string(),
        }
    }
}

/// How input changes are detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchMode {
    /// Interval ticker only.
    Poll,
    /// Filesystem events wake the ticker early.
    Events,
}

/// Reconciliation settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Seconds between modification-time checks.
    pub poll_interval_secs: u64,

    /// Seconds without a heartbeat before a runtime backend is disabled.
    /// Zero or negative turns expiry off.
    pub runtime_ttl_secs: i64,

    pub watch_mode: WatchMode,

    /// Signal sent to the routing process after publishing.
    pub reload_signal: String,

    /// Weight given to registrations that omit one (or send 0).
    pub default_register_weight: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 2,
            runtime_ttl_secs: 15,
            watch_mode: WatchMode::Poll,
            reload_signal: "SIGHUP".to_string(),
            default_register_weight: 10,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
