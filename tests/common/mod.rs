//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use proxy_control::config::ControlConfig;
use proxy_control::Reconciler;
use serde_json::Value;
use tempfile::TempDir;

pub const DISCOVERY: &str = "data/k8s_endpoints.json";
pub const RUNTIME: &str = "data/backends_runtime.json";
pub const PUBLISHED: &str = "config/proxy_config.json";

/// An isolated document directory plus a config pointing into it.
///
/// The PID file never exists here, so no real signal is ever sent.
pub struct Fixture {
    pub dir: TempDir,
    pub config: ControlConfig,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ControlConfig::default();
        config.paths.base_dir = dir.path().to_path_buf();
        config.paths.pid_file = PathBuf::from("run/proxy.pid");
        Self { dir, config }
    }

    pub fn with_ttl(mut self, ttl: i64) -> Self {
        self.config.sync.runtime_ttl_secs = ttl;
        self
    }

    pub fn engine(&self) -> Arc<Reconciler> {
        Arc::new(Reconciler::from_config(&self.config).unwrap())
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    pub fn write(&self, rel: &str, doc: &Value) {
        write_json(&self.path(rel), doc);
    }

    pub fn read(&self, rel: &str) -> Value {
        serde_json::from_slice(&fs::read(self.path(rel)).unwrap()).unwrap()
    }

    pub fn read_text(&self, rel: &str) -> String {
        fs::read_to_string(self.path(rel)).unwrap()
    }
}

pub fn write_json(path: &Path, doc: &Value) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, serde_json::to_vec_pretty(doc).unwrap()).unwrap();
}

pub fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}
