use std::collections::HashSet;
use std::time::Duration;

use sqlx::SqlitePool;
use tokio::time::Instant;
use vault_types::{is_ignored_basename, VaultError};

use crate::SyncContext;

#[derive(Debug, Clone, serde::Serialize)]
pub struct SyncState {
    pub is_synced: bool,
    pub pending: Vec<String>,
    pub processing: usize,
    pub waited: Duration,
}

/// Polls every 500ms until the collection is quiescent or `timeout` elapses.
/// Reuses `pool` (passed in, not checked out fresh per iteration) so repeated
/// polling doesn't starve the catalog's connection pool.
pub async fn wait_for_sync(
    ctx: &SyncContext,
    pool: &SqlitePool,
    collection: &str,
    timeout: Duration,
) -> Result<SyncState, VaultError> {
    let deadline = Instant::now() + timeout;
    loop {
        let state = snapshot(
            &ctx.collections_root,
            pool,
            &ctx.coordinator,
            collection,
        )
        .await?;
        if state.is_synced || Instant::now() >= deadline {
            return Ok(state);
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
}

/// Instantaneous sync snapshot for a collection, with no polling/waiting.
/// Shared by `wait_for_sync` and the health auditor's consistency sweep so
/// both agree on what "pending" means.
pub async fn snapshot(
    collections_root: &std::path::Path,
    pool: &SqlitePool,
    coordinator: &crate::PathCoordinator,
    collection: &str,
) -> Result<SyncState, VaultError> {
    let collection_dir = collections_root.join(collection);
    let folder_files = list_folder_files(&collection_dir).await?;
    let db_files: HashSet<String> = vault_catalog::ObjectRepository::list_ready_names(pool, collection)
        .await
        .map_err(VaultError::catalog)?
        .into_iter()
        .collect();
    let processing = coordinator.has_in_flight_under(&collection_dir);

    let pending: Vec<String> = folder_files
        .into_iter()
        .filter(|name| !db_files.contains(name))
        .collect();

    Ok(SyncState {
        is_synced: !processing && pending.is_empty(),
        pending,
        processing: usize::from(processing),
        waited: Duration::default(),
    })
}

async fn list_folder_files(dir: &std::path::Path) -> Result<Vec<String>, VaultError> {
    let mut names = Vec::new();
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(_) => return Ok(names), // collection directory not yet created
    };
    while let Some(entry) = entries.next_entry().await.map_err(VaultError::store)? {
        let file_type = entry.file_type().await.map_err(VaultError::store)?;
        if !file_type.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if !is_ignored_basename(&name) {
            names.push(name);
        }
    }
    Ok(names)
}
