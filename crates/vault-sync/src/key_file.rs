use std::path::Path;

use tracing::info;
use vault_crypto::hash_api_key;
use vault_types::VaultError;

use crate::SyncContext;

/// A `.vault_key` write is not an ingestion: it updates the stored hash for
/// the collection's secret rather than becoming an object.
pub async fn refresh_key_from_file(ctx: &SyncContext, collection: &str, path: &Path) -> Result<(), VaultError> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(c) => c.trim().to_string(),
        Err(_) => return Ok(()),
    };
    if contents.is_empty() {
        return Ok(());
    }
    let hash = hash_api_key(&contents);
    let pool = ctx.catalog.pool();
    let existing = vault_catalog::CollectionRepository::get(&pool, collection)
        .await
        .map_err(VaultError::catalog)?;
    if existing.is_none() {
        let mut tx = pool.begin().await.map_err(VaultError::catalog)?;
        vault_catalog::CollectionRepository::upsert(&mut tx, collection, Some(&contents))
            .await
            .map_err(VaultError::catalog)?;
        tx.commit().await.map_err(VaultError::catalog)?;
        return Ok(());
    }
    sqlx::query("UPDATE collections SET api_key_hash = ? WHERE name = ?")
        .bind(&hash)
        .bind(collection)
        .execute(&pool)
        .await
        .map_err(VaultError::catalog)?;
    info!(collection, "collection key refreshed from .vault_key");
    Ok(())
}
