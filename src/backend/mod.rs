//! Canonical backend representation.
//!
//! # Data Flow
//! ```text
//! discovery document ─┐
//!                     ├→ normalize.rs (lenient field coercion, provenance tag)
//! runtime registry  ──┘      → record.rs `Backend` (the only shape past this point)
//! ```
//!
//! # Design Decisions
//! - Loosely-typed JSON never leaves `normalize.rs`
//! - Identity is `(host, port)`; ordering of `BackendKey` is the publish order

pub mod normalize;
pub mod record;

pub use normalize::{normalize, RawDocument, Snapshot, SourceRecord};
pub use record::{Backend, BackendKey, Provenance};
