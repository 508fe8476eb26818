//! Metrics exposition.
//!
//! # Metrics
//! - `control_reconcile_total` (counter): Reconciles by reason
//! - `control_reconcile_duration_seconds` (histogram): time inside the lock
//! - `control_published_backends` (gauge): backends in the last publish
//! - `control_ttl_expired_total` (counter): runtime backends disabled by TTL
//! - `control_reload_notify_total` (counter): notifications by outcome
//! - `control_registrations_total` (counter): registry mutations by op

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::StartupError;

/// Install the Prometheus exporter and its HTTP listener. Needs a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), StartupError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| StartupError::Metrics(e.to_string()))?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}
