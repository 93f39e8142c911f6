use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::broadcast;

use crate::error::StoreError;
use crate::store::{KeyValueStore, StorageChange, notify_change};

/// SQLite-backed [`KeyValueStore`]. Each key is one row holding its value
/// as JSON text.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    change_tx: broadcast::Sender<StorageChange>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        tracing::info!(path = %path.display(), "opened workspace store");
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value_json TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            ",
        )?;
        let (change_tx, _change_rx) = broadcast::channel(64);
        Ok(Self {
            conn: Mutex::new(conn),
            change_tx,
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Backend("sqlite connection lock poisoned".to_string()))
    }

    /// Last write time of `key`, as RFC 3339.
    pub fn updated_at(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.conn()?;
        let updated_at = conn
            .query_row(
                "SELECT updated_at FROM kv WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(updated_at)
    }
}

fn load_value(conn: &Connection, key: &str) -> Result<Option<Value>, StoreError> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value_json FROM kv WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?;

    match raw {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let conn = self.conn()?;
        load_value(&conn, key)
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let value_json = serde_json::to_string(&value)?;
        let old_value = {
            let mut conn = self.conn()?;
            let tx = conn.transaction()?;
            // A corrupt previous value must not block overwriting it.
            let old_value = load_value(&tx, key).ok().flatten();
            tx.execute(
                "INSERT OR REPLACE INTO kv (key, value_json, updated_at) VALUES (?1, ?2, ?3)",
                params![key, value_json, Utc::now().to_rfc3339()],
            )?;
            tx.commit()?;
            old_value
        };

        notify_change(
            &self.change_tx,
            StorageChange {
                key: key.to_string(),
                old_value,
                new_value: value,
            },
        );
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.change_tx.subscribe()
    }
}
