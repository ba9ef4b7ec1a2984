//! Local state storage
//!
//! ## Table of Contents
//! - **StateStore**: Trait for key/value backends
//! - **MemoryStore**: In-memory store (default, tests)
//! - **FileStore**: JSON file that survives restarts
//! - **keys**: Key builders for the values the client keeps

use crate::error::{ClockError, Result};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Trait for state storage backends
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Get a value by key
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Set a value
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()>;

    /// Delete a key
    async fn delete(&self, key: &str) -> Result<()>;

    /// List keys with a prefix
    async fn list_prefix(&self, prefix: &str) -> Result<Vec<String>>;

    /// Persist pending writes. No-op for volatile stores.
    async fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// Store name for logging
    fn name(&self) -> &str;
}

/// Get and deserialize JSON from the store
pub async fn store_get_json<T: DeserializeOwned>(
    store: &dyn StateStore,
    key: &str,
) -> Result<Option<T>> {
    match store.get(key).await? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

/// Serialize and set JSON in the store, then flush
pub async fn store_set_json<T: Serialize>(
    store: &dyn StateStore,
    key: &str,
    value: &T,
) -> Result<()> {
    let bytes = serde_json::to_vec(value)?;
    store.set(key, bytes).await?;
    store.flush().await
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    /// Create a new memory store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.data.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.data.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.data.write().await.remove(key);
        Ok(())
    }

    async fn list_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let data = self.data.read().await;
        Ok(data.keys().filter(|k| k.starts_with(prefix)).cloned().collect())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// File-backed store
///
/// Holds everything in memory and rewrites the whole JSON file on flush.
/// An unreadable or corrupt file starts empty rather than failing.
pub struct FileStore {
    path: PathBuf,
    data: RwLock<HashMap<String, Vec<u8>>>,
}

impl FileStore {
    /// Open or create a file store
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let data: HashMap<String, Vec<u8>> = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ClockError::storage(format!("Failed to read store: {}", e)))?;
            serde_json::from_str(&contents).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Corrupt store file, starting empty");
                HashMap::new()
            })
        } else {
            HashMap::new()
        };

        info!(path = %path.display(), entries = data.len(), "File store opened");

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl StateStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.data.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.data.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.data.write().await.remove(key);
        Ok(())
    }

    async fn list_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let data = self.data.read().await;
        Ok(data.keys().filter(|k| k.starts_with(prefix)).cloned().collect())
    }

    async fn flush(&self) -> Result<()> {
        let contents = {
            let data = self.data.read().await;
            serde_json::to_string_pretty(&*data)?
        };

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ClockError::storage(format!("Failed to create dir: {}", e)))?;
        }

        tokio::fs::write(&self.path, contents)
            .await
            .map_err(|e| ClockError::storage(format!("Failed to write store: {}", e)))?;

        debug!(path = %self.path.display(), "File store flushed");
        Ok(())
    }

    fn name(&self) -> &str {
        "file"
    }
}

/// Type alias for a shared store
pub type BoxedStateStore = Arc<dyn StateStore>;

/// Create a memory store
pub fn memory_store() -> BoxedStateStore {
    Arc::new(MemoryStore::new())
}

/// Open the store a config asks for: file-backed when a path is set
pub fn open_store(path: Option<&Path>) -> Result<BoxedStateStore> {
    match path {
        Some(path) => Ok(Arc::new(FileStore::open(path)?)),
        None => Ok(memory_store()),
    }
}

/// Keys for values the client keeps locally
pub mod keys {
    /// Bearer token for the backend
    pub const ACCESS_TOKEN: &str = "joseon/auth/access_token";
    /// Per-user, per-day action flags
    pub const DAILY: &str = "joseon/daily";

    /// Build the daily-flags key for a user and game day
    pub fn daily(user_id: u64, day_count: u32) -> String {
        format!("{}{}", daily_user(user_id), day_count)
    }

    /// Prefix covering every day of one user
    pub fn daily_user(user_id: u64) -> String {
        format!("{}/{}/", DAILY, user_id)
    }
}
