//! Backend normalizer.
//!
//! # Responsibilities
//! - Turn heterogeneous source records into one `Backend` shape
//! - Tag every record with its provenance
//! - Degrade malformed fields to defaults instead of failing
//!
//! # Defaults
//! - Missing or unusable numbers → 0
//! - `enabled` → true, `is_warming_up` → false
//! - Telemetry that is not a number → absent
//! - Ports outside 1..=65535 → 0 (filtered out at merge)

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::backend::record::{Backend, Provenance};

const HOST_FIELDS: &[&str] = &["ip", "address", "host"];
const WARMING_FIELDS: &[&str] = &["is_warming_up", "warming_up"];

/// A record exactly as it arrived from one of the two sources.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceRecord {
    Discovery(Value),
    Runtime(Value),
}

impl SourceRecord {
    pub fn normalize(&self) -> Backend {
        match self {
            SourceRecord::Discovery(raw) => normalize(raw, Provenance::Discovery),
            SourceRecord::Runtime(raw) => normalize(raw, Provenance::Runtime),
        }
    }
}

/// Normalize one raw record. Never fails.
pub fn normalize(raw: &Value, provenance: Provenance) -> Backend {
    let empty = Map::new();
    let obj = raw.as_object().unwrap_or(&empty);

    Backend {
        host: text(first(obj, HOST_FIELDS)),
        port: port(first(obj, &["port"])),
        weight: clamp_u32(int(obj.get("weight"))),
        gpu_usage: ratio(obj.get("gpu_usage")),
        vram_usage: ratio(obj.get("vram_usage")),
        enabled: flag(obj.get("enabled"), true),
        warming_up: flag(first(obj, WARMING_FIELDS), false),
        last_seen: int(obj.get("last_seen")).max(0) as u64,
        provenance,
    }
}

/// `{updated_at, backends[]}` as read from disk, before normalization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDocument {
    #[serde(default)]
    pub updated_at: Value,
    #[serde(default)]
    pub backends: Value,
}

impl RawDocument {
    pub fn into_records(self, provenance: Provenance) -> (u64, Vec<SourceRecord>) {
        let updated_at = int(Some(&self.updated_at)).max(0) as u64;
        let items = match self.backends {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => {
                tracing::debug!(kind = value_kind(&other), "backends is not a list, treating as empty");
                Vec::new()
            }
        };
        let records = items
            .into_iter()
            .map(|raw| match provenance {
                Provenance::Discovery => SourceRecord::Discovery(raw),
                Provenance::Runtime => SourceRecord::Runtime(raw),
            })
            .collect();
        (updated_at, records)
    }

    pub fn normalize(self, provenance: Provenance) -> Snapshot {
        let (updated_at, records) = self.into_records(provenance);
        Snapshot {
            updated_at,
            backends: records.iter().map(SourceRecord::normalize).collect(),
        }
    }
}

/// A normalized source document. Also the persisted runtime registry shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub updated_at: u64,
    pub backends: Vec<Backend>,
}

fn first<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|n| obj.get(*n).filter(|v| !v.is_null()))
}

pub(crate) fn text(v: Option<&Value>) -> String {
    match v {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

pub(crate) fn int(v: Option<&Value>) -> i64 {
    match v {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|u| u.min(i64::MAX as u64) as i64))
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64))
                .unwrap_or(0)
        }
        Some(Value::Bool(b)) => i64::from(*b),
        _ => 0,
    }
}

pub(crate) fn port(v: Option<&Value>) -> u16 {
    u16::try_from(int(v)).unwrap_or(0)
}

pub(crate) fn clamp_u32(n: i64) -> u32 {
    n.clamp(0, u32::MAX as i64) as u32
}

pub(crate) fn flag(v: Option<&Value>, default: bool) -> bool {
    match v {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(default),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => true,
            "false" | "0" | "no" | "off" | "" => false,
            _ => default,
        },
        _ => default,
    }
}

pub(crate) fn ratio(v: Option<&Value>) -> Option<f64> {
    let f = match v? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    f.is_finite().then_some(f)
}

fn value_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
