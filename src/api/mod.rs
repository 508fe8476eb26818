//! HTTP API over the reconciliation engine.
//!
//! # Routes
//! ```text
//! GET  /api/status                         → version, settings, last report
//! GET  /api/backends                       → merged view with sources
//! POST /api/register                       → registration / heartbeat
//! POST /api/backends/{ip}/{port}/weight    → manual weight override
//! POST /api/sync                           → manual Reconcile
//! ```
//!
//! Handlers are thin: parse, hand off to the engine on the blocking pool,
//! serialize the report.

pub mod auth;
pub mod handlers;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ApiConfig;
use crate::sync::Reconciler;
use self::auth::require_api_key;
use self::handlers::*;

/// Shared handler state.
#[derive(Clone)]
pub struct ApiState {
    pub engine: Arc<Reconciler>,
    pub api_key: Arc<str>,
}

/// Build the API router.
pub fn router(engine: Arc<Reconciler>, config: &ApiConfig) -> Router {
    let state = ApiState {
        engine,
        api_key: Arc::from(config.api_key.as_str()),
    };

    Router::new()
        .route("/api/status", get(get_status))
        .route("/api/backends", get(get_backends))
        .route("/api/register", post(register))
        .route("/api/backends/{ip}/{port}/weight", post(set_weight))
        .route("/api/sync", post(sync_now))
        .layer(middleware::from_fn_with_state(state.clone(), require_api_key))
        .with_state(state)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_secs),
        ))
        .layer(TraceLayer::new_for_http())
}
