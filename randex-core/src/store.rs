//! SQLite-backed path store.
//!
//! Persists one committed generation of `(category, id) -> absolute path`
//! entries per category. A rebuild replaces a category's whole generation in
//! a single transaction, so concurrent readers observe either the old or the
//! new entry set, never a mix. The store is a cache of the filesystem, not a
//! source of truth: [`PathStore::reset`] wipes it at startup and the indexer
//! repopulates it from disk.

use std::path::{Path, PathBuf};

use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::error::Result;

/// Handle to the persistent index store. Cheap to clone (pooled).
#[derive(Clone, Debug)]
pub struct PathStore {
    pool: SqlitePool,
}

impl PathStore {
    /// Open (or create) the store at `path` and apply schema and pragmas.
    pub async fn open(path: &Path) -> Result<Self> {
        let url = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        // WAL keeps readers unblocked while a rebuild transaction commits.
        sqlx::query("PRAGMA journal_mode=WAL").execute(&pool).await?;
        sqlx::query("PRAGMA synchronous=NORMAL")
            .execute(&pool)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// In-memory store for tests. Single connection: every pooled connection
    /// would otherwise get its own private database.
    pub async fn open_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS asset_categories (
                 name TEXT PRIMARY KEY,
                 item_count INTEGER NOT NULL
             )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS asset_entries (
                 category TEXT NOT NULL,
                 id INTEGER NOT NULL,
                 path TEXT NOT NULL,
                 PRIMARY KEY (category, id)
             )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Drop every generation. Called once at startup before the initial scan;
    /// the filesystem is authoritative and entries from a previous run may be
    /// stale.
    pub async fn reset(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM asset_entries")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM asset_categories")
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Commit a new generation for `category`, replacing the previous one.
    ///
    /// Ids are assigned 1..=N in the order given, which is the indexer's
    /// traversal order. Id N is not guaranteed to refer to the same path
    /// across generations; every rebuild renumbers.
    pub async fn rebuild(&self, category: &str, paths: &[PathBuf]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM asset_entries WHERE category = ?")
            .bind(category)
            .execute(&mut *tx)
            .await?;

        for (idx, path) in paths.iter().enumerate() {
            sqlx::query("INSERT INTO asset_entries (category, id, path) VALUES (?, ?, ?)")
                .bind(category)
                .bind(idx as i64 + 1)
                .bind(path.to_string_lossy().as_ref())
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query(
            "INSERT INTO asset_categories (name, item_count) VALUES (?, ?)
             ON CONFLICT(name) DO UPDATE SET item_count = excluded.item_count",
        )
        .bind(category)
        .bind(paths.len() as i64)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(paths.len() as u64)
    }

    /// Resolve an id within the current generation. Ids outside
    /// `1..=item_count` and unknown categories are soft misses, not errors.
    pub async fn get(&self, category: &str, id: i64) -> Result<Option<PathBuf>> {
        let row = sqlx::query("SELECT path FROM asset_entries WHERE category = ? AND id = ?")
            .bind(category)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| PathBuf::from(row.get::<String, _>("path"))))
    }

    /// Committed item count for `category`, or `None` if the category has no
    /// committed generation.
    pub async fn item_count(&self, category: &str) -> Result<Option<u64>> {
        let row = sqlx::query("SELECT item_count FROM asset_categories WHERE name = ?")
            .bind(category)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| row.get::<i64, _>("item_count").max(0) as u64))
    }

    /// Names of every category with a committed generation, sorted.
    pub async fn list_categories(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT name FROM asset_categories ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| row.get::<String, _>("name"))
            .collect())
    }

    /// Remove a category and its generation. Idempotent: deleting a category
    /// that is already gone is a no-op.
    pub async fn delete_category(&self, category: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM asset_entries WHERE category = ?")
            .bind(category)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM asset_categories WHERE name = ?")
            .bind(category)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[tokio::test]
    async fn rebuild_assigns_dense_ids() -> Result<()> {
        let store = PathStore::open_in_memory().await?;
        store
            .rebuild("photos", &paths(&["/a/1.jpg", "/a/2.jpg", "/a/3.jpg"]))
            .await?;

        assert_eq!(store.item_count("photos").await?, Some(3));
        assert_eq!(store.get("photos", 1).await?, Some(PathBuf::from("/a/1.jpg")));
        assert_eq!(store.get("photos", 3).await?, Some(PathBuf::from("/a/3.jpg")));
        assert_eq!(store.get("photos", 0).await?, None);
        assert_eq!(store.get("photos", 4).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn rebuild_replaces_previous_generation() -> Result<()> {
        let store = PathStore::open_in_memory().await?;
        store
            .rebuild("photos", &paths(&["/a/1.jpg", "/a/2.jpg", "/a/3.jpg"]))
            .await?;
        store.rebuild("photos", &paths(&["/a/9.jpg"])).await?;

        assert_eq!(store.item_count("photos").await?, Some(1));
        assert_eq!(store.get("photos", 1).await?, Some(PathBuf::from("/a/9.jpg")));
        // Ids from the discarded generation no longer resolve.
        assert_eq!(store.get("photos", 2).await?, None);
        assert_eq!(store.get("photos", 3).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_category_is_a_soft_miss() -> Result<()> {
        let store = PathStore::open_in_memory().await?;
        assert_eq!(store.get("nope", 1).await?, None);
        assert_eq!(store.item_count("nope").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn delete_category_is_idempotent() -> Result<()> {
        let store = PathStore::open_in_memory().await?;
        store.rebuild("gifs", &paths(&["/g/1.gif"])).await?;
        store.rebuild("photos", &paths(&["/a/1.jpg"])).await?;

        store.delete_category("gifs").await?;
        store.delete_category("gifs").await?;

        assert_eq!(store.item_count("gifs").await?, None);
        assert_eq!(store.list_categories().await?, vec!["photos".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn reset_discards_everything() -> Result<()> {
        let store = PathStore::open_in_memory().await?;
        store.rebuild("photos", &paths(&["/a/1.jpg"])).await?;
        store.reset().await?;

        assert!(store.list_categories().await?.is_empty());
        assert_eq!(store.get("photos", 1).await?, None);
        Ok(())
    }
}
