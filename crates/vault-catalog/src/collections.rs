use chrono::Utc;
use sqlx::{Row, SqliteExecutor};
use vault_crypto::{generate_api_key, hash_api_key, verify_api_key};
use vault_types::Collection;

use crate::CatalogError;

fn row_to_collection(row: sqlx::sqlite::SqliteRow) -> Result<Collection, CatalogError> {
    let created_at: String = row.try_get("created_at")?;
    let is_active: i64 = row.try_get("is_active")?;
    Ok(Collection {
        name: row.try_get("name")?,
        api_key_hash: row.try_get("api_key_hash")?,
        created_at: created_at.parse().unwrap_or_else(|_| Utc::now()),
        is_active: is_active != 0,
    })
}

/// Repository of collection rows. Every method takes a generic `SqliteExecutor`
/// so a caller holding a transaction (or the sync barrier holding a pooled
/// connection) can reuse it instead of checking one out per call.
pub struct CollectionRepository;

impl CollectionRepository {
    pub async fn get<'e, E>(executor: E, name: &str) -> Result<Option<Collection>, CatalogError>
    where
        E: SqliteExecutor<'e>,
    {
        let row = sqlx::query("SELECT name, api_key_hash, created_at, is_active FROM collections WHERE name = ?")
            .bind(name)
            .fetch_optional(executor)
            .await?;
        row.map(row_to_collection).transpose()
    }

    pub async fn get_active<'e, E>(executor: E, name: &str) -> Result<Option<Collection>, CatalogError>
    where
        E: SqliteExecutor<'e>,
    {
        let row = sqlx::query(
            "SELECT name, api_key_hash, created_at, is_active FROM collections WHERE name = ? AND is_active = 1",
        )
        .bind(name)
        .fetch_optional(executor)
        .await?;
        row.map(row_to_collection).transpose()
    }

    pub async fn list<'e, E>(executor: E, active_only: bool) -> Result<Vec<Collection>, CatalogError>
    where
        E: SqliteExecutor<'e>,
    {
        let sql = if active_only {
            "SELECT name, api_key_hash, created_at, is_active FROM collections WHERE is_active = 1 ORDER BY name"
        } else {
            "SELECT name, api_key_hash, created_at, is_active FROM collections ORDER BY name"
        };
        let rows = sqlx::query(sql).fetch_all(executor).await?;
        rows.into_iter().map(row_to_collection).collect()
    }

    /// Insert the collection if absent, atomically (lookup + insert share one
    /// connection so two concurrent callers can't both decide to insert).
    /// When `preset_secret` is `None` a fresh key is generated and returned
    /// alongside the row; when the collection already exists the existing row
    /// is returned and the second element is `None` regardless of `preset_secret`.
    pub async fn upsert(
        tx: &mut sqlx::SqliteConnection,
        name: &str,
        preset_secret: Option<&str>,
    ) -> Result<(Collection, Option<String>), CatalogError> {
        if let Some(existing) = Self::get(&mut *tx, name).await? {
            return Ok((existing, None));
        }
        let (secret, generated) = match preset_secret {
            Some(s) => (s.to_string(), None),
            None => {
                let key = generate_api_key();
                (key.clone(), Some(key))
            }
        };
        let hash = hash_api_key(&secret);
        let now = Utc::now().to_rfc3339();
        sqlx::query("INSERT INTO collections (name, api_key_hash, created_at, is_active) VALUES (?, ?, ?, 1)")
            .bind(name)
            .bind(&hash)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        Ok((
            Collection {
                name: name.to_string(),
                api_key_hash: hash,
                created_at: Utc::now(),
                is_active: true,
            },
            generated,
        ))
    }

    pub async fn verify_key<'e, E>(executor: E, name: &str, presented: &str) -> Result<bool, CatalogError>
    where
        E: SqliteExecutor<'e>,
    {
        match Self::get_active(executor, name).await? {
            Some(collection) => Ok(verify_api_key(presented, &collection.api_key_hash)),
            None => Ok(false),
        }
    }

    pub async fn rotate_key<'e, E>(executor: E, name: &str) -> Result<Option<String>, CatalogError>
    where
        E: SqliteExecutor<'e>,
    {
        let new_key = generate_api_key();
        let hash = hash_api_key(&new_key);
        let result = sqlx::query("UPDATE collections SET api_key_hash = ? WHERE name = ?")
            .bind(&hash)
            .bind(name)
            .execute(executor)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some(new_key))
    }

    pub async fn deactivate<'e, E>(executor: E, name: &str) -> Result<bool, CatalogError>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query("UPDATE collections SET is_active = 0 WHERE name = ?")
            .bind(name)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
