use std::net::IpAddr;

use vault_types::VaultError;

use crate::state::AppState;

/// Verifies `X-Collection-Key` against a collection's stored hash, gated by
/// the auth limiter's sliding window. A currently-blocked key is rejected
/// before the key is ever checked, so a correct key presented mid-block still
/// returns `RateLimited` (scenario 4 in the design's testable properties).
pub async fn authenticate(
    state: &AppState,
    collection: &str,
    presented_key: Option<&str>,
    client_ip: IpAddr,
) -> Result<(), VaultError> {
    if let Some(retry_after) = state.auth_limiter.check_blocked(client_ip, collection) {
        return Err(VaultError::RateLimited { retry_after });
    }

    let key = match presented_key {
        Some(k) if !k.is_empty() => k,
        _ => {
            record_failure(state, client_ip, collection);
            return Err(VaultError::AuthFailed);
        }
    };

    let pool = state.catalog.pool();
    let verified = vault_catalog::CollectionRepository::verify_key(&pool, collection, key)
        .await
        .map_err(VaultError::catalog)?;

    if verified {
        state.auth_limiter.record_success(client_ip, collection);
        Ok(())
    } else {
        record_failure(state, client_ip, collection);
        Err(VaultError::AuthFailed)
    }
}

fn record_failure(state: &AppState, client_ip: IpAddr, collection: &str) {
    state.metrics.auth_failures_total.inc();
    if state.auth_limiter.record_failure(client_ip, collection).is_some() {
        state.metrics.auth_rate_limited_total.inc();
    }
}
