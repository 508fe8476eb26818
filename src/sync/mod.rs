//! Reconciliation subsystem.
//!
//! # Data Flow
//! ```text
//! Triggers:
//!     watcher.rs (mtime change on either input)   ─┐
//!     register / set_weight (registry.rs upsert)   ├─▶ engine.rs Reconcile (one at a time)
//!     manual sync / startup                        ─┘
//!
//! Reconcile:
//!     load discovery + runtime (store, backend::normalize)
//!     → ttl.rs sweep (persist registry if changed)
//!     → merge.rs (runtime shadows discovery, sorted)
//!     → publish.rs (atomic write)
//!     → notify.rs (best-effort reload signal)
//!     → ReconcileReport
//! ```
//!
//! # Design Decisions
//! - A single mutex serializes every Reconcile and every registry write
//! - Steps inside one Reconcile are strictly sequential
//! - A failed notification never rolls back the published document

pub mod engine;
pub mod merge;
pub mod notify;
pub mod publish;
pub mod registry;
pub mod ttl;
pub mod watcher;

pub use engine::{BackendsView, MutationReport, ReconcileReport, Reconciler, Trigger};
pub use notify::{NotifyOutcome, ReloadNotifier, ReloadSignal, SignalOutcome};
pub use registry::{Registration, WeightUpdate};

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in whole Unix seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
