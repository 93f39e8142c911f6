use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::StoreError;

// === Keys ===

pub const WORKSPACES_KEY: &str = "workspaces";
pub const NAVIGATION_VISIBLE_KEY: &str = "navigationVisible";

/// Emitted after every successful `set`.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageChange {
    pub key: String,
    pub old_value: Option<Value>,
    pub new_value: Value,
}

/// Durable key-value storage. A `set` either replaces the whole value under
/// the key or fails; there is no partial write and no locking.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;

    fn subscribe(&self) -> broadcast::Receiver<StorageChange>;
}

pub(crate) fn notify_change(tx: &broadcast::Sender<StorageChange>, change: StorageChange) {
    if tx.send(change).is_err() {
        debug!("dropping storage change: no active subscribers");
    }
}

// === In-memory backend ===

/// Process-local store. Contents vanish with the process.
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
    change_tx: broadcast::Sender<StorageChange>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (change_tx, _change_rx) = broadcast::channel(64);
        Self {
            entries: Mutex::new(HashMap::new()),
            change_tx,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let old_value = {
            let mut entries = self
                .entries
                .lock()
                .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))?;
            entries.insert(key.to_string(), value.clone())
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

// === Typed facade ===

/// Typed reads and writes over a [`KeyValueStore`].
#[derive(Clone)]
pub struct PersistentStore {
    backend: Arc<dyn KeyValueStore>,
}

impl PersistentStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Reads `key`, falling back to `T::default()` when nothing is stored.
    pub async fn read<T>(&self, key: &str) -> Result<T, StoreError>
    where
        T: DeserializeOwned + Default,
    {
        self.read_or(key, T::default()).await
    }

    pub async fn read_or<T>(&self, key: &str, default: T) -> Result<T, StoreError>
    where
        T: DeserializeOwned,
    {
        match self.backend.get(key).await? {
            Some(Value::Null) | None => Ok(default),
            Some(value) => Ok(serde_json::from_value(value)?),
        }
    }

    pub async fn write<T>(&self, key: &str, value: &T) -> Result<(), StoreError>
    where
        T: Serialize + ?Sized,
    {
        let value = serde_json::to_value(value)?;
        self.backend.set(key, value).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.backend.subscribe()
    }
}
