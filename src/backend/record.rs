//! Backend record and identity.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which source produced a backend record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Declarative service-discovery snapshot; read-only to the engine.
    Discovery,
    /// Self-registered entry in the engine-owned runtime registry.
    Runtime,
}

/// Identity of a backend. Ordering is host first, then port.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BackendKey {
    pub host: String,
    pub port: u16,
}

impl BackendKey {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for BackendKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// One traffic target, normalized from either source.
///
/// Serializes with the runtime registry's field names; provenance is not
/// persisted since each document holds a single source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Backend {
    #[serde(rename = "ip")]
    pub host: String,
    pub port: u16,
    pub weight: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpu_usage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vram_usage: Option<f64>,
    pub enabled: bool,
    #[serde(rename = "is_warming_up")]
    pub warming_up: bool,
    /// Unix seconds of the last liveness evidence; 0 disables TTL tracking.
    pub last_seen: u64,
    #[serde(skip)]
    pub provenance: Provenance,
}

impl Backend {
    pub fn key(&self) -> BackendKey {
        BackendKey::new(self.host.clone(), self.port)
    }

    pub fn matches(&self, key: &BackendKey) -> bool {
        self.port == key.port && self.host == key.host
    }

    /// A record can be routed to only with a host and a non-zero port.
    pub fn is_addressable(&self) -> bool {
        !self.host.is_empty() && self.port > 0
    }
}
