use std::sync::Arc;

use vault_catalog::{Catalog, ObjectRepository};
use vault_store::{build_object_store, CircuitBreaker, CircuitBreakerConfig, ObjectStoreClient};
use vault_sync::{CoordinatorConfig, PathCoordinator, SyncContext};
use vault_telemetry::MetricsRegistry;

async fn context() -> (tempfile::TempDir, Arc<SyncContext>) {
    let dir = tempfile::tempdir().unwrap();
    let catalog = Catalog::connect_file(dir.path().join("vault.db"), 4).await.unwrap();
    let store = build_object_store("memory://").unwrap();
    let client = ObjectStoreClient::new(store, CircuitBreaker::new(CircuitBreakerConfig::default()));
    let ctx = SyncContext {
        collections_root: dir.path().to_path_buf(),
        catalog: Arc::new(catalog),
        store: Arc::new(client),
        coordinator: PathCoordinator::new(CoordinatorConfig::default()),
        metrics: Arc::new(MetricsRegistry::new()),
    };
    (dir, Arc::new(ctx))
}

#[tokio::test]
async fn fresh_file_becomes_a_ready_object() {
    let (dir, ctx) = context().await;
    let collection_dir = dir.path().join("alpha");
    tokio::fs::create_dir_all(&collection_dir).await.unwrap();
    let file_path = collection_dir.join("README.md");
    tokio::fs::write(&file_path, b"hello\n").await.unwrap();

    vault_sync::ingest_path(&ctx, &file_path).await.unwrap();

    let names = ObjectRepository::list_ready_names(&ctx.catalog.pool(), "alpha").await.unwrap();
    assert_eq!(names, vec!["README.md".to_string()]);
}

#[tokio::test]
async fn overwrite_keeps_a_single_row_with_the_new_hash() {
    let (dir, ctx) = context().await;
    let collection_dir = dir.path().join("alpha");
    tokio::fs::create_dir_all(&collection_dir).await.unwrap();
    let file_path = collection_dir.join("README.md");

    tokio::fs::write(&file_path, b"hello\n").await.unwrap();
    vault_sync::ingest_path(&ctx, &file_path).await.unwrap();
    tokio::fs::write(&file_path, b"world\n").await.unwrap();
    vault_sync::ingest_path(&ctx, &file_path).await.unwrap();

    let names = ObjectRepository::list_ready_names(&ctx.catalog.pool(), "alpha").await.unwrap();
    assert_eq!(names.len(), 1);
    let obj = ObjectRepository::get_ready(&ctx.catalog.pool(), "alpha", "README.md")
        .await
        .unwrap()
        .unwrap();
    assert_ne!(obj.hash_sha256, vault_crypto::hash_bytes(b"hello\n"));
}

#[tokio::test]
async fn deleting_the_file_tombstones_the_object() {
    let (dir, ctx) = context().await;
    let collection_dir = dir.path().join("alpha");
    tokio::fs::create_dir_all(&collection_dir).await.unwrap();
    let file_path = collection_dir.join("README.md");
    tokio::fs::write(&file_path, b"hello\n").await.unwrap();
    vault_sync::ingest_path(&ctx, &file_path).await.unwrap();

    tokio::fs::remove_file(&file_path).await.unwrap();
    vault_sync::delete_path(&ctx, &file_path).await.unwrap();

    assert!(ObjectRepository::list_ready_names(&ctx.catalog.pool(), "alpha")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn barrier_reports_synced_once_the_file_is_ingested() {
    let (dir, ctx) = context().await;
    let collection_dir = dir.path().join("beta");
    tokio::fs::create_dir_all(&collection_dir).await.unwrap();
    let file_path = collection_dir.join("a.txt");
    tokio::fs::write(&file_path, b"data").await.unwrap();

    let pool = ctx.catalog.pool();
    let before = vault_sync::barrier::wait_for_sync(&ctx, &pool, "beta", std::time::Duration::from_millis(100))
        .await
        .unwrap();
    assert!(!before.is_synced);

    vault_sync::ingest_path(&ctx, &file_path).await.unwrap();
    let after = vault_sync::barrier::wait_for_sync(&ctx, &pool, "beta", std::time::Duration::from_millis(100))
        .await
        .unwrap();
    assert!(after.is_synced);
}
