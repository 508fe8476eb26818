//! Merge engine.
//!
//! Discovery records are inserted first and runtime records overwrite them,
//! so precedence follows provenance, never timestamps. The result is sorted
//! by `(host, port)` so published output is independent of input order.

use std::collections::BTreeMap;

use crate::backend::{Backend, BackendKey};

/// Combine both sources into one deduplicated, ordered backend list.
pub fn merge(discovery: &[Backend], runtime: &[Backend]) -> Vec<Backend> {
    let mut by_key: BTreeMap<BackendKey, &Backend> = BTreeMap::new();

    for b in discovery {
        by_key.insert(b.key(), b);
    }
    for b in runtime {
        by_key.insert(b.key(), b);
    }

    let total = by_key.len();
    let merged: Vec<Backend> = by_key
        .into_values()
        .filter(|b| b.is_addressable())
        .cloned()
        .collect();

    if merged.len() < total {
        tracing::debug!(dropped = total - merged.len(), "Dropped backends without host or port");
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{normalize, Provenance};
    use serde_json::json;

    fn disc(ip: &str, port: u16, weight: u32) -> Backend {
        normalize(&json!({"ip": ip, "port": port, "weight": weight}), Provenance::Discovery)
    }

    fn rt(ip: &str, port: u16, weight: u32) -> Backend {
        normalize(
            &json!({"ip": ip, "port": port, "weight": weight, "is_warming_up": true, "last_seen": 5}),
            Provenance::Runtime,
        )
    }

    #[test]
    fn test_runtime_shadows_discovery() {
        let discovery = vec![disc("10.0.0.11", 9000, 10), disc("10.0.0.12", 9000, 10)];
        let runtime = vec![rt("10.0.0.11", 9000, 5)];

        let merged = merge(&discovery, &runtime);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0], runtime[0]);
        assert_eq!(merged[1], discovery[1]);
    }

    #[test]
    fn test_precedence_ignores_list_order() {
        let discovery = vec![disc("b", 1, 1), disc("a", 1, 1)];
        let mut runtime = vec![rt("a", 1, 7), rt("b", 1, 8)];

        let first = merge(&discovery, &runtime);
        runtime.reverse();
        let second = merge(&discovery, &runtime);

        assert_eq!(first, second);
        assert!(first.iter().all(|b| b.provenance == Provenance::Runtime));
    }

    #[test]
    fn test_output_is_sorted_by_host_then_port() {
        let discovery = vec![disc("10.0.0.2", 80, 1), disc("10.0.0.1", 9000, 1), disc("10.0.0.1", 80, 1)];
        let merged = merge(&discovery, &[]);
        let keys: Vec<String> = merged.iter().map(|b| b.key().to_string()).collect();
        assert_eq!(keys, vec!["10.0.0.1:80", "10.0.0.1:9000", "10.0.0.2:80"]);

        let again = merge(&discovery, &[]);
        assert_eq!(
            serde_json::to_string(&merged).unwrap(),
            serde_json::to_string(&again).unwrap()
        );
    }

    #[test]
    fn test_unaddressable_records_are_dropped() {
        let discovery = vec![
            normalize(&json!({"ip": "", "port": 80}), Provenance::Discovery),
            normalize(&json!({"ip": "10.0.0.1"}), Provenance::Discovery),
            disc("10.0.0.3", 80, 1),
        ];
        let merged = merge(&discovery, &[]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].host, "10.0.0.3");
    }

    #[test]
    fn test_duplicate_discovery_entries_collapse() {
        let discovery = vec![disc("a", 1, 1), disc("a", 1, 2)];
        let merged = merge(&discovery, &[]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].weight, 2);
    }
}
