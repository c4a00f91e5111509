use std::path::Path;
use std::time::Instant;

use tracing::{debug, info, warn};
use vault_crypto::hash_file;
use vault_store::CircuitState;
use vault_types::{is_ignored_basename, object_key, VaultError};

use crate::SyncContext;

/// Hash → upload → catalog-commit pipeline for one file.
///
/// Safe to call redundantly (the coordinator guarantees at most one call runs
/// per path at a time, but a caller might still invoke this for a path that
/// no longer qualifies, e.g. it's been deleted since the event fired).
pub async fn ingest_path(ctx: &SyncContext, path: &Path) -> Result<(), VaultError> {
    match tokio::fs::metadata(path).await {
        Ok(m) if m.is_file() => {}
        _ => {
            debug!(path = %path.display(), "ingest skipped: not a regular file");
            return Ok(());
        }
    }

    let (collection, name) = match ctx.parse_collection_and_name(path) {
        Some(pair) => pair,
        None => {
            debug!(path = %path.display(), "ingest skipped: not directly under a collection");
            return Ok(());
        }
    };

    if is_ignored_basename(&name) {
        if name == ".vault_key" {
            return super::key_file::refresh_key_from_file(ctx, &collection, path).await;
        }
        return Ok(());
    }

    ensure_collection(ctx, &collection).await?;

    let pipeline_started = Instant::now();
    let (hash, size) = hash_file(path).await.map_err(VaultError::store)?;
    let key = object_key(&collection, &name);

    let was_open = ctx.store.breaker().state() == CircuitState::Open;
    let upload_started = Instant::now();
    let result = ctx.store.put(&key, path).await;
    ctx.metrics
        .object_store_latency_ms
        .observe(upload_started.elapsed().as_secs_f64() * 1000.0);
    if let Err(err) = &result {
        ctx.metrics.ingestion_failures_total.inc();
        crate::record_breaker_failure(ctx, err, was_open);
        warn!(collection, name, error = %err, "ingestion upload failed");
        return result;
    }

    let pool = ctx.catalog.pool();
    let mut tx = pool.begin().await.map_err(VaultError::catalog)?;
    vault_catalog::ObjectRepository::replace(&mut tx, &collection, &name, &key, &hash, size as i64)
        .await
        .map_err(VaultError::catalog)?;
    tx.commit().await.map_err(VaultError::catalog)?;

    ctx.metrics.ingestions_total.inc();
    ctx.metrics
        .ingestion_duration_seconds
        .observe(pipeline_started.elapsed().as_secs_f64());
    info!(collection, name, hash, size, "ingested");
    Ok(())
}

/// Registers a collection directory the first time it's observed, either as
/// a directory-create event or implicitly via its first file. Generates and
/// persists a `.vault_key` if none is present on disk yet.
pub(crate) async fn ensure_collection(ctx: &SyncContext, collection: &str) -> Result<(), VaultError> {
    let existing = vault_catalog::CollectionRepository::get(&ctx.catalog.pool(), collection)
        .await
        .map_err(VaultError::catalog)?;
    if existing.is_some() {
        return Ok(());
    }

    let key_path = ctx.collections_root.join(collection).join(".vault_key");
    let preset = tokio::fs::read_to_string(&key_path)
        .await
        .ok()
        .map(|s| s.trim().to_string());

    let pool = ctx.catalog.pool();
    let mut tx = pool.begin().await.map_err(VaultError::catalog)?;
    let (_, generated) = vault_catalog::CollectionRepository::upsert(&mut tx, collection, preset.as_deref())
        .await
        .map_err(VaultError::catalog)?;
    tx.commit().await.map_err(VaultError::catalog)?;

    if let Some(key) = generated {
        if let Err(err) = tokio::fs::write(&key_path, &key).await {
            warn!(collection, error = %err, "failed to persist generated collection key");
        } else {
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let _ = tokio::fs::set_permissions(&key_path, std::fs::Permissions::from_mode(0o600)).await;
            }
        }
    }
    Ok(())
}
