//! Control plane for a hot-reloading routing proxy.
//!
//! Merges a declarative discovery snapshot with a self-registered runtime
//! registry, expires silent runtime backends, publishes the result atomically
//! and tells the proxy to reload.

pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod store;
pub mod sync;

pub use config::ControlConfig;
pub use lifecycle::startup::Daemon;
pub use sync::{ReconcileReport, Reconciler, Trigger};
