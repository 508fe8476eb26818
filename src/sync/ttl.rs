//! Runtime TTL sweeper.
//!
//! # State Machine
//! ```text
//! enabled ──(last_seen > 0 && now - last_seen > ttl)──▶ disabled
//! disabled ──(registration / weight update)──▶ enabled
//! ```
//!
//! Only the runtime registry is swept. Discovery entries carry no liveness
//! of their own (`last_seen == 0`) and are owned by the external source.

use std::path::PathBuf;

use crate::backend::{BackendKey, Snapshot};
use crate::error::StoreError;
use crate::store::DocumentStore;

/// Disable stale runtime entries in place.
///
/// Returns the keys that were disabled by this call. A `ttl_secs` of zero or
/// less disables expiry entirely. Updates `updated_at` when anything changed.
pub fn sweep(registry: &mut Snapshot, ttl_secs: i64, now: u64) -> Vec<BackendKey> {
    if ttl_secs <= 0 {
        return Vec::new();
    }
    let ttl = ttl_secs as u64;

    let mut expired = Vec::new();
    for b in registry.backends.iter_mut() {
        if b.enabled && b.last_seen > 0 && now.saturating_sub(b.last_seen) > ttl {
            b.enabled = false;
            expired.push(b.key());
        }
    }

    if !expired.is_empty() {
        registry.updated_at = now;
    }
    expired
}

/// Sweeps the runtime registry and persists the result when it changed.
#[derive(Debug, Clone)]
pub struct TtlSweeper {
    store: DocumentStore,
    registry_path: PathBuf,
    ttl_secs: i64,
}

impl TtlSweeper {
    pub fn new(store: DocumentStore, registry_path: PathBuf, ttl_secs: i64) -> Self {
        Self {
            store,
            registry_path,
            ttl_secs,
        }
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    /// Sweep and, if anything expired, flush the registry before returning.
    pub fn run(&self, mut registry: Snapshot, now: u64) -> Result<(Snapshot, Vec<BackendKey>), StoreError> {
        let expired = sweep(&mut registry, self.ttl_secs, now);
        if !expired.is_empty() {
            self.store.store(&self.registry_path, &registry)?;
            for key in &expired {
                tracing::info!(backend = %key, ttl_secs = self.ttl_secs, "Runtime backend expired, disabled");
            }
            metrics::counter!("control_ttl_expired_total").increment(expired.len() as u64);
        }
        Ok((registry, expired))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{normalize, Provenance, RawDocument};
    use serde_json::json;

    const NOW: u64 = 1_700_000_000;
    const TTL: i64 = 15;

    fn registry(entries: serde_json::Value) -> Snapshot {
        Snapshot {
            updated_at: 1,
            backends: entries
                .as_array()
                .unwrap()
                .iter()
                .map(|v| normalize(v, Provenance::Runtime))
                .collect(),
        }
    }

    #[test]
    fn test_stale_entry_is_disabled() {
        let mut reg = registry(json!([{"ip": "a", "port": 1, "last_seen": NOW - TTL as u64 - 1}]));
        let expired = sweep(&mut reg, TTL, NOW);
        assert_eq!(expired, vec![BackendKey::new("a", 1)]);
        assert!(!reg.backends[0].enabled);
        assert_eq!(reg.updated_at, NOW);
    }

    #[test]
    fn test_fresh_entry_is_untouched() {
        let mut reg = registry(json!([{"ip": "a", "port": 1, "last_seen": NOW - TTL as u64 + 1}]));
        let before = reg.clone();
        assert!(sweep(&mut reg, TTL, NOW).is_empty());
        assert_eq!(reg, before);
    }

    #[test]
    fn test_exact_boundary_is_not_stale() {
        let mut reg = registry(json!([{"ip": "a", "port": 1, "last_seen": NOW - TTL as u64}]));
        assert!(sweep(&mut reg, TTL, NOW).is_empty());
        assert!(reg.backends[0].enabled);
    }

    #[test]
    fn test_untracked_and_future_entries_are_skipped() {
        let mut reg = registry(json!([
            {"ip": "a", "port": 1, "last_seen": 0},
            {"ip": "b", "port": 1, "last_seen": NOW + 100}
        ]));
        assert!(sweep(&mut reg, TTL, NOW).is_empty());
        assert!(reg.backends.iter().all(|b| b.enabled));
    }

    #[test]
    fn test_disabled_ttl_passes_through() {
        let mut reg = registry(json!([{"ip": "a", "port": 1, "last_seen": 1}]));
        let before = reg.clone();
        assert!(sweep(&mut reg, 0, NOW).is_empty());
        assert!(sweep(&mut reg, -5, NOW).is_empty());
        assert_eq!(reg, before);
    }

    #[test]
    fn test_second_sweep_is_a_no_op() {
        let mut reg = registry(json!([{"ip": "a", "port": 1, "last_seen": 10}]));
        assert_eq!(sweep(&mut reg, TTL, NOW).len(), 1);
        let after_first = reg.clone();
        assert!(sweep(&mut reg, TTL, NOW).is_empty());
        assert_eq!(reg, after_first);
    }

    #[test]
    fn test_run_persists_only_on_change() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(dir.path());
        let sweeper = TtlSweeper::new(store.clone(), PathBuf::from("rt.json"), TTL);

        let (_, expired) = sweeper
            .run(registry(json!([{"ip": "a", "port": 1, "last_seen": NOW - 1}])), NOW)
            .unwrap();
        assert!(expired.is_empty());
        assert!(!dir.path().join("rt.json").exists());

        let (swept, expired) = sweeper
            .run(registry(json!([{"ip": "a", "port": 1, "last_seen": NOW - 100}])), NOW)
            .unwrap();
        assert_eq!(expired.len(), 1);

        let on_disk = store
            .load("rt.json", RawDocument::default())
            .normalize(Provenance::Runtime);
        assert_eq!(on_disk, swept);
        assert!(!on_disk.backends[0].enabled);
    }
}
