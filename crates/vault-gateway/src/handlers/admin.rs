use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::error::ApiResult;
use crate::state::AppState;

/// `POST /admin/reset-pool` — discards the current SQLite connection pool and
/// opens a fresh one against the same database, without restarting the
/// process. Operator escape hatch for a pool that's wedged on a stuck
/// connection.
pub async fn reset_pool(State(state): State<AppState>) -> ApiResult<StatusCode> {
    state.catalog.reset_pool().await.map_err(vault_types::VaultError::catalog)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /admin/pool-stats` — current pool size and idle-connection count.
pub async fn pool_stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.catalog.pool_stats())
}
