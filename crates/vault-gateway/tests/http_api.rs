use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use vault_catalog::{Catalog, CollectionRepository};
use vault_gateway::auth_limiter::{AuthLimiter, AuthLimiterConfig};
use vault_gateway::health::{HealthAuditor, HealthAuditorConfig};
use vault_gateway::{router, AppState};
use vault_store::{build_object_store, CircuitBreaker, CircuitBreakerConfig, ObjectStoreClient};
use vault_sync::{CollectionWatcher, CoordinatorConfig, PathCoordinator, WatcherConfig};
use vault_telemetry::MetricsRegistry;

/// Builds a fully wired `AppState` against a temp-dir collections root, an
/// in-memory object store, and a fresh sqlite catalog, registering one
/// collection with a known key. Mirrors the fixture shape in
/// `vault-sync`'s pipeline tests, generalized to the gateway's wider
/// collaborator set.
async fn test_state() -> (tempfile::TempDir, AppState, String) {
    let dir = tempfile::tempdir().unwrap();
    let collections_root = dir.path().to_path_buf();

    let catalog = Arc::new(Catalog::connect_file(dir.path().join("vault.db"), 4).await.unwrap());
    let backend = build_object_store("memory://").unwrap();
    let breaker = CircuitBreaker::new(CircuitBreakerConfig::default());
    let store = Arc::new(ObjectStoreClient::new(backend, breaker));
    let coordinator = PathCoordinator::new(CoordinatorConfig::default());
    let watcher = CollectionWatcher::new(collections_root.clone(), WatcherConfig::default());
    let metrics = Arc::new(MetricsRegistry::new());
    let auth_limiter = Arc::new(AuthLimiter::new(AuthLimiterConfig::default()));
    let health = Arc::new(HealthAuditor::new(
        collections_root.clone(),
        catalog.clone(),
        store.clone(),
        watcher.clone(),
        coordinator.clone(),
        metrics.clone(),
        HealthAuditorConfig::default(),
    ));

    let secret = "super-secret-key".to_string();
    let collection_dir = collections_root.join("alpha");
    tokio::fs::create_dir_all(&collection_dir).await.unwrap();
    let file_path = collection_dir.join("README.md");
    tokio::fs::write(&file_path, b"hello\n").await.unwrap();

    let pool = catalog.pool();
    let mut tx = pool.begin().await.unwrap();
    CollectionRepository::upsert(&mut tx, "alpha", Some(&secret)).await.unwrap();
    tx.commit().await.unwrap();

    let sync_ctx = vault_sync::SyncContext {
        collections_root: collections_root.clone(),
        catalog: catalog.clone(),
        store: store.clone(),
        coordinator: coordinator.clone(),
        metrics: metrics.clone(),
    };
    vault_sync::ingest_path(&sync_ctx, &file_path).await.unwrap();

    let state = AppState {
        collections_root,
        catalog,
        store,
        coordinator,
        watcher,
        auth_limiter,
        health,
        metrics,
    };
    (dir, state, secret)
}

#[tokio::test]
async fn list_objects_requires_a_valid_key() {
    let (_dir, state, _secret) = test_state().await;
    let app = router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/collections/alpha/objects?sync_timeout=0")
                .header("X-Collection-Key", "wrong-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn list_objects_returns_the_ingested_file_with_a_valid_key() {
    let (_dir, state, secret) = test_state().await;
    let app = router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/collections/alpha/objects?sync_timeout=0")
                .header("X-Collection-Key", secret)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["objects"], serde_json::json!(["README.md"]));
}

#[tokio::test]
async fn download_object_streams_the_stored_bytes() {
    let (_dir, state, secret) = test_state().await;
    let app = router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/collections/alpha/objects/README.md")
                .header("X-Collection-Key", secret)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("X-Object-Hash-SHA256"));
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"hello\n");
}

#[tokio::test]
async fn download_object_404s_for_an_unknown_name() {
    let (_dir, state, secret) = test_state().await;
    let app = router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/collections/alpha/objects/missing.txt")
                .header("X-Collection-Key", secret)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_hashes_returns_items_with_name_and_hash_only() {
    let (_dir, state, secret) = test_state().await;
    let app = router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/collections/alpha/hashes?sync_timeout=0")
                .header("X-Collection-Key", secret)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["collection"], serde_json::json!("alpha"));
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["name"], serde_json::json!("README.md"));
    assert!(items[0]["hash_sha256"].is_string());
    assert!(items[0].get("size_bytes").is_none());
}

#[tokio::test]
async fn get_hash_returns_collection_name_and_hash() {
    let (_dir, state, secret) = test_state().await;
    let app = router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/collections/alpha/hashes/README.md")
                .header("X-Collection-Key", secret)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["collection"], serde_json::json!("alpha"));
    assert_eq!(body["name"], serde_json::json!("README.md"));
    assert!(body["hash_sha256"].is_string());
    assert!(body.get("size_bytes").is_none());
}

#[tokio::test]
async fn repeated_bad_keys_trip_the_rate_limiter() {
    let (_dir, state, _secret) = test_state().await;
    let app = router(state);

    for _ in 0..5 {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/collections/alpha/hashes")
                    .header("X-Collection-Key", "wrong-key")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let blocked = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/collections/alpha/hashes")
                .header("X-Collection-Key", "wrong-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(blocked.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(blocked.headers().contains_key("Retry-After"));
}

#[tokio::test]
async fn health_endpoints_report_ok_for_a_healthy_stack() {
    let (_dir, state, _secret) = test_state().await;
    let app = router(state);

    let live = app
        .clone()
        .oneshot(Request::builder().uri("/health/live").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(live.status(), StatusCode::OK);

    let ready = app
        .clone()
        .oneshot(Request::builder().uri("/health/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(ready.status(), StatusCode::OK);

    let metrics = app
        .oneshot(
            Request::builder()
                .uri("/health/metrics/json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(metrics.status(), StatusCode::OK);
}
