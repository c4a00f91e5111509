use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use vault_types::VaultError;

/// Wraps a `VaultError` so `axum` can turn it into a response. Grounded on the
/// teacher's split between a closed domain error and an adapter that knows
/// about HTTP status codes — here one `VaultError` enum plays both roles.
pub struct ApiError(pub VaultError);

impl From<VaultError> for ApiError {
    fn from(err: VaultError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, retry_after) = match &self.0 {
            VaultError::NotFound => (StatusCode::NOT_FOUND, None),
            VaultError::AuthFailed => (StatusCode::UNAUTHORIZED, None),
            VaultError::RateLimited { retry_after } => (StatusCode::TOO_MANY_REQUESTS, Some(*retry_after)),
            VaultError::CircuitOpen { time_remaining } => {
                (StatusCode::SERVICE_UNAVAILABLE, Some(*time_remaining))
            }
            VaultError::StoreFailure(_) | VaultError::CatalogFailure(_) => {
                (StatusCode::BAD_GATEWAY, None)
            }
            VaultError::Transient(_) => (StatusCode::SERVICE_UNAVAILABLE, None),
            VaultError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, None),
        };

        if matches!(
            self.0,
            VaultError::StoreFailure(_) | VaultError::CatalogFailure(_) | VaultError::Config(_)
        ) {
            tracing::error!(error = %self.0, "request failed");
        }

        let body = Json(json!({ "detail": self.0.to_string() }));
        let mut response = (status, body).into_response();
        if let Some(retry_after) = retry_after {
            if let Ok(value) = axum::http::HeaderValue::from_str(&retry_after.as_secs().to_string()) {
                response.headers_mut().insert("Retry-After", value);
            }
        }
        response
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
