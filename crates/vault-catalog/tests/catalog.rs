use vault_catalog::{Catalog, CollectionRepository, ObjectRepository};

async fn temp_catalog() -> (tempfile::TempDir, Catalog) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vault.db");
    let catalog = Catalog::connect_file(&path, 4).await.unwrap();
    (dir, catalog)
}

#[tokio::test]
async fn upsert_generates_a_key_once() {
    let (_dir, catalog) = temp_catalog().await;
    let pool = catalog.pool();
    let mut tx = pool.begin().await.unwrap();
    let (first, generated) = CollectionRepository::upsert(&mut tx, "alpha", None).await.unwrap();
    tx.commit().await.unwrap();
    assert!(generated.is_some());
    assert_eq!(first.name, "alpha");

    let mut tx = pool.begin().await.unwrap();
    let (second, generated_again) = CollectionRepository::upsert(&mut tx, "alpha", None).await.unwrap();
    tx.commit().await.unwrap();
    assert!(generated_again.is_none());
    assert_eq!(second.api_key_hash, first.api_key_hash);
}

#[tokio::test]
async fn replace_object_keeps_exactly_one_row_per_key() {
    let (_dir, catalog) = temp_catalog().await;
    let pool = catalog.pool();
    let mut tx = pool.begin().await.unwrap();
    CollectionRepository::upsert(&mut tx, "alpha", Some("secret")).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = pool.begin().await.unwrap();
    ObjectRepository::replace(&mut tx, "alpha", "README.md", "alpha/README.md", "hash-one", 6)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let mut tx = pool.begin().await.unwrap();
    ObjectRepository::replace(&mut tx, "alpha", "README.md", "alpha/README.md", "hash-two", 7)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let names = ObjectRepository::list_ready_names(&pool, "alpha").await.unwrap();
    assert_eq!(names, vec!["README.md".to_string()]);
    let obj = ObjectRepository::get_ready(&pool, "alpha", "README.md")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(obj.hash_sha256, "hash-two");
}

#[tokio::test]
async fn tombstone_hides_object_from_ready_list() {
    let (_dir, catalog) = temp_catalog().await;
    let pool = catalog.pool();
    let mut tx = pool.begin().await.unwrap();
    CollectionRepository::upsert(&mut tx, "alpha", Some("secret")).await.unwrap();
    ObjectRepository::replace(&mut tx, "alpha", "a.txt", "alpha/a.txt", "hash", 1)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let removed = ObjectRepository::tombstone(&pool, "alpha", "a.txt").await.unwrap();
    assert!(removed);
    assert!(ObjectRepository::list_ready_names(&pool, "alpha")
        .await
        .unwrap()
        .is_empty());

    let removed_again = ObjectRepository::tombstone(&pool, "alpha", "a.txt").await.unwrap();
    assert!(!removed_again);
}

#[tokio::test]
async fn verify_key_is_case_of_constant_time_compare() {
    let (_dir, catalog) = temp_catalog().await;
    let pool = catalog.pool();
    let mut tx = pool.begin().await.unwrap();
    CollectionRepository::upsert(&mut tx, "alpha", Some("correct-secret")).await.unwrap();
    tx.commit().await.unwrap();

    assert!(CollectionRepository::verify_key(&pool, "alpha", "correct-secret")
        .await
        .unwrap());
    assert!(!CollectionRepository::verify_key(&pool, "alpha", "wrong-secret")
        .await
        .unwrap());
    assert!(!CollectionRepository::verify_key(&pool, "missing", "anything")
        .await
        .unwrap());
}
