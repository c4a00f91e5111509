use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::state::AppState;

/// `GET /health/live` — the process is up and answering requests. Never
/// touches the catalog or store: liveness is about this process, not its
/// dependencies.
pub async fn live() -> impl IntoResponse {
    StatusCode::OK
}

/// `GET /health/ready` — catalog and filesystem are reachable, i.e. this
/// instance can usefully serve the API surface.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    if state.health.is_ready().await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    #[serde(default)]
    pub include_consistency: bool,
}

/// `GET /health/status` — the full per-component breakdown, optionally with
/// the last consistency sweep's counters.
pub async fn status(State(state): State<AppState>, Query(query): Query<StatusQuery>) -> impl IntoResponse {
    let report = state.health.status(query.include_consistency).await;
    let code = match report.status {
        crate::health::ComponentStatus::Up => StatusCode::OK,
        crate::health::ComponentStatus::Degraded => StatusCode::OK,
        crate::health::ComponentStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
    };
    (code, Json(report))
}

/// `GET /health/metrics` — Prometheus text exposition.
pub async fn metrics_prometheus(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.to_prometheus(),
    )
}

/// `GET /health/metrics/json` — the same counters as structured JSON, for
/// callers that would rather not parse the text exposition format.
pub async fn metrics_json(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metrics.to_json())
}
