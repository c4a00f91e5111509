//! Transactional catalog of collections and objects, backed by SQLite through `sqlx`.
//!
//! Mutating operations (`replace_object`, `tombstone`) run inside a single
//! transaction so a reader never observes neither-old-nor-new state. Read
//! operations are generic over `sqlx::SqliteExecutor` so a caller that already
//! holds a connection or transaction (the sync barrier, in particular) can
//! reuse it instead of checking out a fresh one from the pool on every poll.

mod collections;
mod objects;

use std::path::Path;

use parking_lot::RwLock;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use vault_types::VaultError;

pub use collections::CollectionRepository;
pub use objects::ObjectRepository;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

impl From<CatalogError> for VaultError {
    fn from(err: CatalogError) -> Self {
        VaultError::catalog(err)
    }
}

/// Snapshot of pool utilization, surfaced by `/admin/pool-stats`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PoolStats {
    pub size: u32,
    pub idle: usize,
}

/// The catalog's connection pool is replaceable at runtime (the admin
/// `reset-pool` operation) without restarting the process, so it lives
/// behind a lock rather than being handed out by value.
pub struct Catalog {
    database_url: String,
    max_connections: u32,
    pool: RwLock<SqlitePool>,
}

impl Catalog {
    /// Connect (creating the database file if absent) and run migrations.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, CatalogError> {
        let pool = Self::open_pool(database_url, max_connections).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self {
            database_url: database_url.to_string(),
            max_connections,
            pool: RwLock::new(pool),
        })
    }

    /// Convenience constructor for a file path, mirroring how the worker and
    /// startup scanner address the catalog by filesystem location.
    pub async fn connect_file(path: impl AsRef<Path>, max_connections: u32) -> Result<Self, CatalogError> {
        let url = format!("sqlite://{}?mode=rwc", path.as_ref().display());
        Self::connect(&url, max_connections).await
    }

    async fn open_pool(database_url: &str, max_connections: u32) -> Result<SqlitePool, CatalogError> {
        let options: SqliteConnectOptions = database_url.parse()?;
        let options = options.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        Ok(pool)
    }

    pub fn pool(&self) -> SqlitePool {
        self.pool.read().clone()
    }

    pub fn pool_stats(&self) -> PoolStats {
        let pool = self.pool.read();
        PoolStats {
            size: pool.size(),
            idle: pool.num_idle(),
        }
    }

    /// Dispose the current pool and open a fresh one against the same database,
    /// without restarting the process. Grounds the `/admin/reset-pool` endpoint.
    pub async fn reset_pool(&self) -> Result<(), CatalogError> {
        let new_pool = Self::open_pool(&self.database_url, self.max_connections).await?;
        let old_pool = {
            let mut guard = self.pool.write();
            std::mem::replace(&mut *guard, new_pool)
        };
        old_pool.close().await;
        Ok(())
    }

    /// Trivial liveness probe used by the health auditor.
    pub async fn ping(&self) -> Result<(), CatalogError> {
        sqlx::query("SELECT 1").execute(&self.pool()).await?;
        Ok(())
    }
}
