//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → Reconciler → startup Reconcile → change watcher → API listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → watcher exits, API drains → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: the first publish happens before the API accepts writes
//! - A failed startup Reconcile is fatal; later failures are logged and retried
//!   on the next trigger

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
