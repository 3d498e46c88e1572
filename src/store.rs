//! Embedded key-value store keyed by process id.
//!
//! One SQLite table plays the role of a single bucket; values are JSON text.

use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::error::{AlimeError, Result};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS items (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
)";

/// Queries run on the blocking pool so handlers never hold a worker thread
/// on SQLite I/O.
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open (or create) the database file and its table.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        debug!("Opening store at {}", path.display());
        Self::init(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, query: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            // A panic while holding the lock cannot leave a half-applied statement behind
            let conn = conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            query(&conn)
        })
        .await?
        .map_err(AlimeError::from)
    }

    pub async fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        let key = key.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO items (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, json],
            )
        })
        .await?;
        Ok(())
    }

    /// Fetch and deserialize a value; a missing key is `KeyNotFound`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        self.find(key)
            .await?
            .ok_or_else(|| AlimeError::KeyNotFound(key.to_string()))
    }

    pub async fn find<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let key = key.to_string();
        let value: Option<String> = self
            .with_conn(move |conn| {
                conn.query_row("SELECT value FROM items WHERE key = ?1", params![key], |row| row.get(0))
                    .optional()
            })
            .await?;

        match value {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        self.with_conn(move |conn| conn.execute("DELETE FROM items WHERE key = ?1", params![key]))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaStorageData;

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = Store::in_memory().unwrap();
        let data = MediaStorageData::new("abc", "talk.mp4", "uploads");

        store.put("abc", &data).await.unwrap();
        let loaded: MediaStorageData = store.get("abc").await.unwrap();
        assert_eq!(loaded, data);

        store.delete("abc").await.unwrap();
        assert!(matches!(
            store.get::<MediaStorageData>("abc").await,
            Err(AlimeError::KeyNotFound(key)) if key == "abc"
        ));
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let store = Store::in_memory().unwrap();
        store.put("k", &1u32).await.unwrap();
        store.put("k", &2u32).await.unwrap();
        assert_eq!(store.get::<u32>("k").await.unwrap(), 2);
        assert_eq!(store.find::<u32>("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db").join("data.db");

        {
            let store = Store::open(&path).unwrap();
            store.put("pid", &serde_json::json!({"filePath": "uploads/pid.mp4"})).await.unwrap();
        }

        let store = Store::open(&path).unwrap();
        let value: serde_json::Value = store.get("pid").await.unwrap();
        assert_eq!(value["filePath"], "uploads/pid.mp4");
    }

    #[tokio::test]
    async fn test_type_mismatch_is_json_error() {
        let store = Store::in_memory().unwrap();
        store.put("k", "text").await.unwrap();
        assert!(matches!(store.get::<u32>("k").await, Err(AlimeError::Json(_))));
    }
}
