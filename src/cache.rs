//! Durable cache of resolved tower positions.
//!
//! Rows are only ever created, by the bulk loader or by resolver write-back.
//! An insert that collides with an existing key is a silent no-op, so the
//! first recorded position for a tower always wins.

use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::model::{TowerId, TowerLocation};

const POPULATED_KEY: &str = "is_cache_populated";

#[derive(Clone)]
pub struct TowerCache {
    pool: SqlitePool,
}

impl TowerCache {
    /// Open (creating if missing) the cache database at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .with_context(|| format!("failed to open tower cache at {}", path.display()))?;
        Self::from_pool(pool).await
    }

    /// In-memory cache for tests and embedders that want a throwaway store.
    pub async fn in_memory() -> Result<Self> {
        // every sqlite :memory: connection is a separate database, so the
        // pool must hold exactly one connection for its whole lifetime
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(SqliteConnectOptions::from_str("sqlite::memory:")?)
            .await?;
        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::raw_sql(include_str!("../schema.sql"))
            .execute(&pool)
            .await
            .context("failed to apply cache schema")?;
        Ok(Self { pool })
    }

    /// Exact-match point lookup; no partial or fuzzy matching.
    pub async fn lookup(&self, tower: TowerId) -> Result<Option<TowerLocation>> {
        let row: Option<(f64, f64)> = sqlx::query_as(
            "select lat, lon from cell_tower where mcc = ?1 and mnc = ?2 and lac = ?3 and cid = ?4",
        )
        .bind(tower.mcc)
        .bind(tower.mnc)
        .bind(tower.lac)
        .bind(tower.cid)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(lat, lon)| TowerLocation { tower, lat, lon }))
    }

    /// Insert one position, skipping silently if the key already exists.
    /// Returns whether a row was actually written.
    pub async fn insert(&self, location: &TowerLocation) -> Result<bool> {
        let result = sqlx::query(
            "insert into cell_tower (mcc, mnc, lac, cid, lat, lon)
             values (?1, ?2, ?3, ?4, ?5, ?6)
             on conflict do nothing",
        )
        .bind(location.tower.mcc)
        .bind(location.tower.mnc)
        .bind(location.tower.lac)
        .bind(location.tower.cid)
        .bind(location.lat)
        .bind(location.lon)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Insert a batch record by record, ignoring key conflicts. Each row
    /// commits on its own; a failure partway keeps everything already written.
    /// Returns the number of rows inserted.
    pub async fn insert_batch(&self, locations: &[TowerLocation]) -> Result<u64> {
        let mut inserted = 0;
        for location in locations {
            if self.insert(location).await? {
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    /// Whether the bulk reference dataset has been fully ingested.
    pub async fn is_populated(&self) -> Result<bool> {
        let value: Option<String> =
            sqlx::query_scalar("select value from settings where key = ?1")
                .bind(POPULATED_KEY)
                .fetch_optional(&self.pool)
                .await?;
        Ok(value.as_deref() == Some("1"))
    }

    /// Record that the bulk reference dataset has been fully ingested.
    pub async fn mark_populated(&self) -> Result<()> {
        sqlx::query("replace into settings (key, value) values (?1, '1')")
            .bind(POPULATED_KEY)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn count(&self) -> Result<i64> {
        let total = sqlx::query_scalar("select count(*) from cell_tower")
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }
}
