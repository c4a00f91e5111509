use tracing::{info, warn};
use vault_types::{is_ignored_basename, VaultError};

use crate::{ingest, SyncContext};

/// Reconciles pre-existing files at boot, before the watcher is armed, so
/// nothing already on disk is processed twice.
///
/// A per-directory or per-file failure is logged and skipped rather than
/// aborting the whole scan: only catalog init and collections-root creation
/// are fatal at boot, everything past that degrades gracefully.
pub async fn scan_existing(ctx: &SyncContext) -> Result<(), VaultError> {
    let mut root_entries = tokio::fs::read_dir(&ctx.collections_root)
        .await
        .map_err(VaultError::store)?;

    let mut collection_dirs = Vec::new();
    while let Some(entry) = root_entries.next_entry().await.map_err(VaultError::store)? {
        let file_type = entry.file_type().await.map_err(VaultError::store)?;
        if file_type.is_dir() {
            collection_dirs.push(entry.path());
        }
    }

    let mut scanned = 0usize;
    for dir in collection_dirs {
        let collection = match dir.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => continue,
        };
        if let Err(err) = ingest::ensure_collection(ctx, &collection).await {
            warn!(collection, error = %err, "startup scan failed to register collection");
            continue;
        }

        let mut entries = tokio::fs::read_dir(&dir).await.map_err(VaultError::store)?;
        while let Some(entry) = entries.next_entry().await.map_err(VaultError::store)? {
            let file_type = entry.file_type().await.map_err(VaultError::store)?;
            if !file_type.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if is_ignored_basename(&name) {
                continue;
            }
            let path = entry.path();
            if let Some(_guard) = ctx.coordinator.gate_for_ingest(&path) {
                if let Err(err) = ingest::ingest_path(ctx, &path).await {
                    warn!(path = %path.display(), error = %err, "startup scan ingestion failed");
                    continue;
                }
                scanned += 1;
            }
        }
    }
    info!(scanned, "startup scan complete");
    Ok(())
}
