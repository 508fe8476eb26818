use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::api::ApiState;
use crate::error::SyncError;
use crate::sync::{BackendsView, MutationReport, ReconcileReport, Registration, Trigger, WeightUpdate};

/// Engine error rendered as `{ok: false, error}`.
pub struct ApiError(SyncError);

impl From<SyncError> for ApiError {
    fn from(e: SyncError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            tracing::error!(error = %self.0, "Request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, Json(json!({"ok": false, "error": self.0.to_string()}))).into_response()
    }
}

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub runtime_ttl_secs: i64,
    pub last_sync: Option<ReconcileReport>,
}

#[derive(Serialize)]
pub struct Envelope<T> {
    pub ok: bool,
    #[serde(flatten)]
    pub body: T,
}

/// Request bodies are parsed leniently; unusable JSON becomes null and fails validation.
fn lenient_json(body: &Bytes) -> Value {
    serde_json::from_slice(body).unwrap_or(Value::Null)
}

pub async fn get_status(State(state): State<ApiState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        runtime_ttl_secs: state.engine.ttl_secs(),
        last_sync: state.engine.last_report().map(|r| (*r).clone()),
    })
}

pub async fn get_backends(
    State(state): State<ApiState>,
) -> Result<Json<Envelope<BackendsView>>, ApiError> {
    let view = state.engine.run_blocking(|engine| engine.backends()).await?;
    Ok(Json(Envelope { ok: true, body: view }))
}

pub async fn register(
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<Json<MutationReport>, ApiError> {
    let registration = Registration::from_json(&lenient_json(&body))?;
    let report = state
        .engine
        .run_blocking(move |engine| engine.register(&registration))
        .await?;
    Ok(Json(report))
}

pub async fn set_weight(
    State(state): State<ApiState>,
    Path((ip, port)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<MutationReport>, ApiError> {
    let weight = WeightUpdate::weight_from_json(&lenient_json(&body));
    let port = port.trim().parse::<i64>().unwrap_or(0);
    let update = WeightUpdate::new(&ip, port, weight)?;
    let report = state
        .engine
        .run_blocking(move |engine| engine.set_weight(&update))
        .await?;
    Ok(Json(report))
}

pub async fn sync_now(State(state): State<ApiState>) -> Result<Json<ReconcileReport>, ApiError> {
    let report = state
        .engine
        .run_blocking(|engine| engine.reconcile(Trigger::Manual))
        .await?;
    Ok(Json(report))
}
