//! HTTP surface for the sync gateway: the authenticated object/hash read API,
//! the health/metrics surface, and the admin surface, plus the auth limiter
//! and health auditor that back them.

pub mod auth;
pub mod auth_limiter;
pub mod error;
pub mod handlers;
pub mod health;
pub mod state;

use std::time::{Duration, Instant};

use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Request body size limit for uploads proxied through this gateway's own
/// endpoints (the sync engine writes files directly to disk; this bounds
/// anything sent to the HTTP surface itself, e.g. future write endpoints).
const REQUEST_BODY_LIMIT_BYTES: usize = 64 * 1024 * 1024;

/// Builds the full router: `/api/v1` object/hash reads, `/health/*`, and
/// `/admin/*`. Grounded on the teacher's `build_http_router` — a
/// `ServiceBuilder` stack of cross-cutting layers wrapping a flat route
/// table, generalized from JSON-RPC-over-POST to a REST surface.
pub fn router(state: AppState) -> Router {
    let metrics_layer = middleware::from_fn_with_state(state.clone(), track_http_metrics);

    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(Duration::from_secs(60)))
        .layer(tower_http::limit::RequestBodyLimitLayer::new(REQUEST_BODY_LIMIT_BYTES));

    let api = Router::new()
        .route("/collections/:collection/objects", get(handlers::objects::list_objects))
        .route(
            "/collections/:collection/objects/*name",
            get(handlers::objects::download_object),
        )
        .route("/collections/:collection/hashes", get(handlers::hashes::list_hashes))
        .route("/collections/:collection/hashes/*name", get(handlers::hashes::get_hash));

    let health = Router::new()
        .route("/live", get(handlers::health::live))
        .route("/ready", get(handlers::health::ready))
        .route("/status", get(handlers::health::status))
        .route("/metrics", get(handlers::health::metrics_prometheus))
        .route("/metrics/json", get(handlers::health::metrics_json));

    let admin = Router::new()
        .route("/reset-pool", post(handlers::admin::reset_pool))
        .route("/pool-stats", get(handlers::admin::pool_stats));

    Router::new()
        .nest("/api/v1", api)
        .nest("/health", health)
        .nest("/admin", admin)
        .layer(middleware)
        .layer(metrics_layer)
        .with_state(state)
}

/// Records `http_requests_total` and `http_request_duration_seconds` for
/// every request that reaches the router, regardless of outcome.
async fn track_http_metrics(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let started = Instant::now();
    let response = next.run(req).await;
    state.metrics.http_requests_total.inc();
    state
        .metrics
        .http_request_duration_seconds
        .observe(started.elapsed().as_secs_f64());
    response
}

/// Serves `router(state)` on `addr` until `shutdown` fires, with the real
/// peer address available to handlers via `ConnectInfo` (the auth limiter
/// keys on client IP).
pub async fn serve(
    addr: std::net::SocketAddr,
    state: AppState,
    shutdown: tokio_util::sync::CancellationToken,
) -> std::io::Result<()> {
    let app = router(state).into_make_service_with_connect_info::<std::net::SocketAddr>();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "gateway listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}
