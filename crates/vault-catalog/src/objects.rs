use chrono::Utc;
use sqlx::{Row, SqliteExecutor};
use vault_types::{Object, ObjectStatus};

use crate::CatalogError;

const OBJECT_COLUMNS: &str =
    "id, collection, name, object_key, hash_sha256, size_bytes, status, created_at, updated_at";

fn row_to_object(row: sqlx::sqlite::SqliteRow) -> Result<Object, CatalogError> {
    let status: String = row.try_get("status")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;
    Ok(Object {
        id: row.try_get("id")?,
        collection: row.try_get("collection")?,
        name: row.try_get("name")?,
        object_key: row.try_get("object_key")?,
        hash_sha256: row.try_get("hash_sha256")?,
        size_bytes: row.try_get("size_bytes")?,
        status: status.parse().unwrap_or(ObjectStatus::Deleted),
        created_at: created_at.parse().unwrap_or_else(|_| Utc::now()),
        updated_at: updated_at.parse().unwrap_or_else(|_| Utc::now()),
    })
}

pub struct ObjectRepository;

impl ObjectRepository {
    pub async fn get_ready<'e, E>(
        executor: E,
        collection: &str,
        name: &str,
    ) -> Result<Option<Object>, CatalogError>
    where
        E: SqliteExecutor<'e>,
    {
        let row = sqlx::query(&format!(
            "SELECT {OBJECT_COLUMNS} FROM objects WHERE collection = ? AND name = ? AND status = ?"
        ))
        .bind(collection)
        .bind(name)
        .bind(ObjectStatus::Ready.as_str())
        .fetch_optional(executor)
        .await?;
        row.map(row_to_object).transpose()
    }

    /// Names of READY objects in a collection, ordered, as the list endpoints expect.
    pub async fn list_ready_names<'e, E>(executor: E, collection: &str) -> Result<Vec<String>, CatalogError>
    where
        E: SqliteExecutor<'e>,
    {
        let rows = sqlx::query("SELECT name FROM objects WHERE collection = ? AND status = ? ORDER BY name")
            .bind(collection)
            .bind(ObjectStatus::Ready.as_str())
            .fetch_all(executor)
            .await?;
        rows.into_iter()
            .map(|r| r.try_get::<String, _>("name").map_err(CatalogError::from))
            .collect()
    }

    pub async fn list_ready<'e, E>(executor: E, collection: &str) -> Result<Vec<Object>, CatalogError>
    where
        E: SqliteExecutor<'e>,
    {
        let rows = sqlx::query(&format!(
            "SELECT {OBJECT_COLUMNS} FROM objects WHERE collection = ? AND status = ? ORDER BY name"
        ))
        .bind(collection)
        .bind(ObjectStatus::Ready.as_str())
        .fetch_all(executor)
        .await?;
        rows.into_iter().map(row_to_object).collect()
    }

    /// Up to `limit` READY rows for a collection, used by the consistency sweep's sampling pass.
    pub async fn sample_ready<'e, E>(
        executor: E,
        collection: &str,
        limit: i64,
    ) -> Result<Vec<Object>, CatalogError>
    where
        E: SqliteExecutor<'e>,
    {
        let rows = sqlx::query(&format!(
            "SELECT {OBJECT_COLUMNS} FROM objects WHERE collection = ? AND status = ? ORDER BY updated_at DESC LIMIT ?"
        ))
        .bind(collection)
        .bind(ObjectStatus::Ready.as_str())
        .bind(limit)
        .fetch_all(executor)
        .await?;
        rows.into_iter().map(row_to_object).collect()
    }

    /// Atomically replace any row sharing `object_key` with a fresh READY row.
    /// Runs inside the caller's transaction so a reader never observes neither
    /// the old nor the new row.
    pub async fn replace(
        tx: &mut sqlx::SqliteConnection,
        collection: &str,
        name: &str,
        object_key: &str,
        hash_sha256: &str,
        size_bytes: i64,
    ) -> Result<(), CatalogError> {
        sqlx::query("DELETE FROM objects WHERE object_key = ?")
            .bind(object_key)
            .execute(&mut *tx)
            .await?;
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO objects (collection, name, object_key, hash_sha256, size_bytes, status, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(collection)
        .bind(name)
        .bind(object_key)
        .bind(hash_sha256)
        .bind(size_bytes)
        .bind(ObjectStatus::Ready.as_str())
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;
        Ok(())
    }

    /// Flip at most one READY row to DELETED. Returns whether a row was tombstoned.
    pub async fn tombstone<'e, E>(executor: E, collection: &str, name: &str) -> Result<bool, CatalogError>
    where
        E: SqliteExecutor<'e>,
    {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE objects SET status = ?, updated_at = ? WHERE collection = ? AND name = ? AND status = ?",
        )
        .bind(ObjectStatus::Deleted.as_str())
        .bind(&now)
        .bind(collection)
        .bind(name)
        .bind(ObjectStatus::Ready.as_str())
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn tombstone_by_key<'e, E>(executor: E, object_key: &str) -> Result<bool, CatalogError>
    where
        E: SqliteExecutor<'e>,
    {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query("UPDATE objects SET status = ?, updated_at = ? WHERE object_key = ? AND status = ?")
            .bind(ObjectStatus::Deleted.as_str())
            .bind(&now)
            .bind(object_key)
            .bind(ObjectStatus::Ready.as_str())
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
