//! Keyed JSON store
//!
//! `SqliteStore` upserts into the `catalog_state` table; `MemoryStore`
//! keeps values in a map for tests and dry runs.

use async_trait::async_trait;
use fmcat_common::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sqlx::SqlitePool;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Keyed get/put over JSON values, last write wins
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Value stored under `key`, `None` if never written
    async fn get_json(&self, key: &str) -> Result<Option<Value>>;

    /// Replace the value stored under `key`
    async fn put_json(&self, key: &str, value: Value) -> Result<()>;
}

/// Typed get with default for missing keys
pub async fn load<T>(store: &dyn CatalogStore, key: &str) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    match store.get_json(key).await? {
        Some(value) => Ok(serde_json::from_value(value)?),
        None => Ok(T::default()),
    }
}

/// Typed put
pub async fn save<T>(store: &dyn CatalogStore, key: &str, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
{
    store.put_json(key, serde_json::to_value(value)?).await
}

/// SQLite-backed store
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Wrap an existing pool, creating the state table if needed
    pub async fn new(pool: SqlitePool) -> Result<Self> {
        super::init_tables(&pool).await?;
        Ok(Self { pool })
    }

    /// Open (or create) the database file
    pub async fn open(db_path: &std::path::Path) -> Result<Self> {
        let pool = super::init_database_pool(db_path).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl CatalogStore for SqliteStore {
    async fn get_json(&self, key: &str) -> Result<Option<Value>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM catalog_state WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        match row {
            Some((value,)) => Ok(Some(serde_json::from_str(&value)?)),
            None => Ok(None),
        }
    }

    async fn put_json(&self, key: &str, value: Value) -> Result<()> {
        sqlx::query(
            "INSERT INTO catalog_state (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value.to_string())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        tracing::debug!(key, "Persisted catalog state");
        Ok(())
    }
}

/// In-memory store
#[derive(Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn get_json(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn put_json(&self, key: &str, value: Value) -> Result<()> {
        self.values.write().await.insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ComponentLibrary;
    use sqlx::sqlite::SqlitePoolOptions;

    /// Single-connection pool so every query sees the same in-memory database
    async fn setup_test_store() -> SqliteStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        SqliteStore::new(pool).await.unwrap()
    }

    #[tokio::test]
    async fn test_sqlite_get_missing_key() {
        let store = setup_test_store().await;
        assert_eq!(store.get_json("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_sqlite_last_write_wins() {
        let store = setup_test_store().await;

        store.put_json("k", serde_json::json!({"v": 1})).await.unwrap();
        store.put_json("k", serde_json::json!({"v": 2})).await.unwrap();

        let value = store.get_json("k").await.unwrap().unwrap();
        assert_eq!(value["v"], 2);
    }

    #[tokio::test]
    async fn test_open_creates_file_and_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("fmcat.db");

        let store = SqliteStore::open(&path).await.unwrap();
        store.put_json("session_state", serde_json::json!({"n": 1})).await.unwrap();
        drop(store);
        assert!(path.exists());

        let reopened = SqliteStore::open(&path).await.unwrap();
        let value = reopened.get_json("session_state").await.unwrap().unwrap();
        assert_eq!(value["n"], 1);
    }

    #[tokio::test]
    async fn test_typed_load_defaults() {
        let store = MemoryStore::new();
        let library: ComponentLibrary = load(&store, "component_library").await.unwrap();
        assert!(library.entries.is_empty());
    }

    #[tokio::test]
    async fn test_typed_save_and_load() {
        let store = setup_test_store().await;
        let values = vec!["a".to_string(), "b".to_string()];

        save(&store, "list", &values).await.unwrap();
        let restored: Vec<String> = load(&store, "list").await.unwrap();

        assert_eq!(restored, values);
    }
}
