pub mod admin;
pub mod hashes;
pub mod health;
pub mod objects;

use std::net::{IpAddr, SocketAddr};

use axum::extract::ConnectInfo;
use axum::http::HeaderMap;

/// Best-effort client IP: the real peer address when served behind
/// `into_make_service_with_connect_info`, otherwise unspecified (exercised by
/// integration tests that drive handlers without a real TCP connection).
pub(crate) fn client_ip(connect_info: Option<ConnectInfo<SocketAddr>>) -> IpAddr {
    connect_info
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::from([0, 0, 0, 0]))
}

pub(crate) fn presented_key(headers: &HeaderMap) -> Option<&str> {
    headers.get("X-Collection-Key").and_then(|v| v.to_str().ok())
}

const DEFAULT_SYNC_TIMEOUT_SECS: u64 = 30;
const MAX_SYNC_TIMEOUT_SECS: u64 = 300;

/// `sync_timeout` query param shared by the two list endpoints. Clamped to
/// `[0, 300]`; `0` disables the sync barrier entirely.
#[derive(Debug, serde::Deserialize)]
pub struct SyncQuery {
    pub sync_timeout: Option<u64>,
}

impl SyncQuery {
    pub(crate) fn timeout(&self) -> std::time::Duration {
        let secs = self
            .sync_timeout
            .unwrap_or(DEFAULT_SYNC_TIMEOUT_SECS)
            .min(MAX_SYNC_TIMEOUT_SECS);
        std::time::Duration::from_secs(secs)
    }
}

/// Builds the ephemeral `SyncContext` the barrier needs from the gateway's
/// long-lived collaborators. Cheap: every field is an `Arc` clone.
pub(crate) fn sync_context(state: &crate::state::AppState) -> vault_sync::SyncContext {
    vault_sync::SyncContext {
        collections_root: state.collections_root.clone(),
        catalog: state.catalog.clone(),
        store: state.store.clone(),
        coordinator: state.coordinator.clone(),
        metrics: state.metrics.clone(),
    }
}

/// Waits on the sync barrier for `collection` if `timeout > 0`, logging (not
/// raising) if it elapses before the collection settles.
pub(crate) async fn maybe_wait_for_sync(state: &crate::state::AppState, collection: &str, timeout: std::time::Duration) {
    if timeout.is_zero() {
        return;
    }
    let ctx = sync_context(state);
    let pool = state.catalog.pool();
    match vault_sync::barrier::wait_for_sync(&ctx, &pool, collection, timeout).await {
        Ok(state) if !state.is_synced => {
            tracing::warn!(collection, pending = state.pending.len(), "sync barrier timed out before collection settled");
        }
        Ok(_) => {}
        Err(err) => tracing::warn!(collection, error = %err, "sync barrier check failed"),
    }
}
