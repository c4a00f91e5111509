use std::path::Path;
use std::time::Instant;

use tracing::{debug, info, warn};
use vault_store::CircuitState;
use vault_types::{is_ignored_basename, object_key, VaultError};

use crate::SyncContext;

/// Object-store-delete → catalog-tombstone pipeline for a path observed absent.
pub async fn delete_path(ctx: &SyncContext, path: &Path) -> Result<(), VaultError> {
    if tokio::fs::metadata(path).await.is_ok() {
        debug!(path = %path.display(), "delete skipped: path still exists (polling artifact)");
        return Ok(());
    }

    let (collection, name) = match ctx.parse_collection_and_name(path) {
        Some(pair) => pair,
        None => return Ok(()),
    };
    if is_ignored_basename(&name) {
        return Ok(());
    }

    let key = object_key(&collection, &name);
    let was_open = ctx.store.breaker().state() == CircuitState::Open;
    let started = Instant::now();
    let result = ctx.store.delete(&key).await;
    ctx.metrics
        .object_store_latency_ms
        .observe(started.elapsed().as_secs_f64() * 1000.0);
    if let Err(err) = &result {
        ctx.metrics.deletion_failures_total.inc();
        crate::record_breaker_failure(ctx, err, was_open);
        warn!(collection, name, error = %err, "deletion failed");
        return result.map(|_| ());
    }

    vault_catalog::ObjectRepository::tombstone(&ctx.catalog.pool(), &collection, &name)
        .await
        .map_err(VaultError::catalog)?;

    ctx.metrics.deletions_total.inc();
    info!(collection, name, "deleted");
    Ok(())
}
