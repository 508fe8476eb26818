//! Config publisher.
//!
//! Renders the merged backend list into the document the routing process
//! reads, then replaces it atomically. The schema is a compatibility
//! contract: new fields must stay optional.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::backend::Backend;
use crate::config::PublishConfig;
use crate::error::StoreError;
use crate::store::DocumentStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenAddr {
    pub host: String,
    pub port: u16,
}

/// One backend as the routing process sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedBackend {
    pub ip: String,
    pub port: u16,
    pub weight: u32,
    pub enabled: bool,
    pub is_warming_up: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu_usage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vram_usage: Option<f64>,
}

impl From<&Backend> for PublishedBackend {
    fn from(b: &Backend) -> Self {
        Self {
            ip: b.host.clone(),
            port: b.port,
            weight: b.weight,
            enabled: b.enabled,
            is_warming_up: b.warming_up,
            gpu_usage: b.gpu_usage,
            vram_usage: b.vram_usage,
        }
    }
}

/// The published configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedConfig {
    pub listen: ListenAddr,
    pub algorithm: String,
    /// When this document was rendered; the "last reconciled" timestamp.
    pub updated_at: u64,
    pub backends: Vec<PublishedBackend>,
}

/// Renders and writes the published configuration.
#[derive(Debug, Clone)]
pub struct Publisher {
    store: DocumentStore,
    path: PathBuf,
    settings: PublishConfig,
}

impl Publisher {
    pub fn new(store: DocumentStore, path: PathBuf, settings: PublishConfig) -> Self {
        Self {
            store,
            path,
            settings,
        }
    }

    /// Absolute location of the published document.
    pub fn path(&self) -> PathBuf {
        self.store.resolve(&self.path)
    }

    /// Pure rendering step.
    pub fn render(&self, merged: &[Backend], now: u64) -> PublishedConfig {
        PublishedConfig {
            listen: ListenAddr {
                host: self.settings.listen_host.clone(),
                port: self.settings.listen_port,
            },
            algorithm: self.settings.algorithm.clone(),
            updated_at: now,
            backends: merged.iter().map(PublishedBackend::from).collect(),
        }
    }

    /// Render and atomically write.
    pub fn publish(&self, merged: &[Backend], now: u64) -> Result<PublishedConfig, StoreError> {
        let doc = self.render(merged, now);
        self.store.store(&self.path, &doc)?;
        metrics::gauge!("control_published_backends").set(doc.backends.len() as f64);
        tracing::debug!(path = %self.path().display(), backends = doc.backends.len(), "Published configuration");
        Ok(doc)
    }
}
