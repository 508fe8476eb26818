//! Runtime registry mutations.
//!
//! Registration doubles as the heartbeat: every call refreshes `last_seen`
//! and re-enables an entry the TTL sweeper disabled.

use serde::Serialize;
use serde_json::Value;

use crate::backend::normalize::{clamp_u32, int, ratio, text};
use crate::backend::{Backend, BackendKey, Provenance, Snapshot};
use crate::error::SyncError;

/// A validated self-registration / heartbeat.
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub key: BackendKey,
    /// `None` means "use the configured default".
    pub weight: Option<u32>,
    pub gpu_usage: Option<f64>,
    pub vram_usage: Option<f64>,
}

impl Registration {
    /// Parse a loosely-typed request body, rejecting bad identities.
    pub fn from_json(body: &Value) -> Result<Self, SyncError> {
        let field = |names: &[&str]| names.iter().find_map(|n| body.get(*n).filter(|v| !v.is_null()));

        let key = validate_identity(&text(field(&["ip", "address", "host"])), int(field(&["port"])))?;
        let weight = match clamp_u32(int(field(&["weight"]))) {
            0 => None,
            w => Some(w),
        };

        Ok(Self {
            key,
            weight,
            gpu_usage: ratio(field(&["gpu_usage"])),
            vram_usage: ratio(field(&["vram_usage"])),
        })
    }
}

/// A validated manual weight override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightUpdate {
    pub key: BackendKey,
    pub weight: u32,
}

impl WeightUpdate {
    pub fn new(host: &str, port: i64, weight: i64) -> Result<Self, SyncError> {
        Ok(Self {
            key: validate_identity(host, port)?,
            weight: clamp_u32(weight),
        })
    }

    /// Weight from a `{ "weight": n }` body; anything unusable is 0.
    pub fn weight_from_json(body: &Value) -> i64 {
        int(body.get("weight"))
    }
}

/// What a mutation did to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Upsert {
    Created,
    Updated,
}

fn validate_identity(host: &str, port: i64) -> Result<BackendKey, SyncError> {
    let host = host.trim();
    if host.is_empty() {
        return Err(SyncError::Rejected("invalid ip/port: missing address".to_string()));
    }
    match u16::try_from(port) {
        Ok(port) if port > 0 => Ok(BackendKey::new(host, port)),
        _ => Err(SyncError::Rejected(format!("invalid ip/port: port {} out of range", port))),
    }
}

/// Upsert a registration. New entries start warming up; existing ones keep
/// their warming flag.
pub fn apply_registration(registry: &mut Snapshot, reg: &Registration, default_weight: u32, now: u64) -> Upsert {
    let weight = reg.weight.unwrap_or(default_weight);
    registry.updated_at = now;

    if let Some(b) = registry.backends.iter_mut().find(|b| b.matches(&reg.key)) {
        b.weight = weight;
        b.gpu_usage = reg.gpu_usage;
        b.vram_usage = reg.vram_usage;
        b.enabled = true;
        b.last_seen = now;
        return Upsert::Updated;
    }

    registry.backends.push(Backend {
        host: reg.key.host.clone(),
        port: reg.key.port,
        weight,
        gpu_usage: reg.gpu_usage,
        vram_usage: reg.vram_usage,
        enabled: true,
        warming_up: true,
        last_seen: now,
        provenance: Provenance::Runtime,
    });
    Upsert::Created
}

/// Upsert a weight override, creating a runtime entry that shadows discovery
/// when none exists yet.
pub fn apply_weight(registry: &mut Snapshot, update: &WeightUpdate, now: u64) -> Upsert {
    registry.updated_at = now;

    if let Some(b) = registry.backends.iter_mut().find(|b| b.matches(&update.key)) {
        b.weight = update.weight;
        b.enabled = true;
        b.last_seen = now;
        return Upsert::Updated;
    }

    registry.backends.push(Backend {
        host: update.key.host.clone(),
        port: update.key.port,
        weight: update.weight,
        gpu_usage: None,
        vram_usage: None,
        enabled: true,
        warming_up: false,
        last_seen: now,
        provenance: Provenance::Runtime,
    });
    Upsert::Created
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registration_parsing() {
        let reg = Registration::from_json(&json!({
            "ip": "10.0.0.13", "port": 9000, "weight": 5, "gpu_usage": 0.2, "vram_usage": "0.1"
        }))
        .unwrap();
        assert_eq!(reg.key, BackendKey::new("10.0.0.13", 9000));
        assert_eq!(reg.weight, Some(5));
        assert_eq!(reg.gpu_usage, Some(0.2));
        assert_eq!(reg.vram_usage, Some(0.1));
    }

    #[test]
    fn test_registration_zero_or_missing_weight_uses_default() {
        let reg = Registration::from_json(&json!({"ip": "a", "port": 1, "weight": 0})).unwrap();
        assert_eq!(reg.weight, None);
        let reg = Registration::from_json(&json!({"ip": "a", "port": 1})).unwrap();
        assert_eq!(reg.weight, None);

        let mut registry = Snapshot::default();
        apply_registration(&mut registry, &reg, 10, 100);
        assert_eq!(registry.backends[0].weight, 10);
    }

    #[test]
    fn test_registration_rejects_bad_identity() {
        for body in [
            json!({"port": 9000}),
            json!({"ip": "  ", "port": 9000}),
            json!({"ip": "a"}),
            json!({"ip": "a", "port": -3}),
            json!({"ip": "a", "port": 70000}),
            json!("not an object"),
        ] {
            let err = Registration::from_json(&body).unwrap_err();
            assert!(err.is_client_error(), "{:?} should be rejected", body);
        }
    }

    #[test]
    fn test_new_registration_is_warming_up() {
        let mut registry = Snapshot::default();
        let reg = Registration::from_json(&json!({"ip": "a", "port": 1, "weight": 5})).unwrap();

        assert_eq!(apply_registration(&mut registry, &reg, 10, 100), Upsert::Created);
        let b = &registry.backends[0];
        assert!(b.warming_up);
        assert!(b.enabled);
        assert_eq!(b.last_seen, 100);
        assert_eq!(b.provenance, Provenance::Runtime);
        assert_eq!(registry.updated_at, 100);
    }

    #[test]
    fn test_reregistration_refreshes_and_keeps_warming_flag() {
        let mut registry = Snapshot::default();
        let reg = Registration::from_json(&json!({"ip": "a", "port": 1, "weight": 5})).unwrap();
        apply_registration(&mut registry, &reg, 10, 100);
        registry.backends[0].warming_up = false;
        registry.backends[0].enabled = false;

        let again = Registration::from_json(&json!({"ip": "a", "port": 1, "weight": 7, "gpu_usage": 0.9})).unwrap();
        assert_eq!(apply_registration(&mut registry, &again, 10, 200), Upsert::Updated);

        assert_eq!(registry.backends.len(), 1);
        let b = &registry.backends[0];
        assert!(!b.warming_up);
        assert!(b.enabled);
        assert_eq!(b.weight, 7);
        assert_eq!(b.gpu_usage, Some(0.9));
        assert_eq!(b.last_seen, 200);
    }

    #[test]
    fn test_weight_update_creates_override() {
        let mut registry = Snapshot::default();
        let update = WeightUpdate::new("10.0.0.11", 9000, 3).unwrap();
        assert_eq!(apply_weight(&mut registry, &update, 50), Upsert::Created);

        let b = &registry.backends[0];
        assert_eq!(b.weight, 3);
        assert!(!b.warming_up);
        assert!(b.enabled);
        assert_eq!(b.last_seen, 50);
    }

    #[test]
    fn test_weight_update_existing_entry() {
        let mut registry = Snapshot::default();
        let reg = Registration::from_json(&json!({"ip": "a", "port": 1, "gpu_usage": 0.4})).unwrap();
        apply_registration(&mut registry, &reg, 10, 100);
        registry.backends[0].enabled = false;

        let update = WeightUpdate::new("a", 1, 0).unwrap();
        assert_eq!(apply_weight(&mut registry, &update, 300), Upsert::Updated);
        let b = &registry.backends[0];
        assert_eq!(b.weight, 0);
        assert!(b.enabled);
        assert!(b.warming_up);
        assert_eq!(b.gpu_usage, Some(0.4));
        assert_eq!(b.last_seen, 300);
    }

    #[test]
    fn test_weight_update_validation() {
        assert!(WeightUpdate::new("", 80, 1).is_err());
        assert!(WeightUpdate::new("a", 0, 1).is_err());
        assert_eq!(WeightUpdate::new("a", 80, -5).unwrap().weight, 0);
        assert_eq!(WeightUpdate::weight_from_json(&json!({"weight": "12"})), 12);
        assert_eq!(WeightUpdate::weight_from_json(&json!({})), 0);
    }
}
