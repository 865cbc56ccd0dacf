//! Secure storage abstraction
//!
//! The session layer only needs string get/set/delete against a device-local
//! secret store. [`SecureStorage`] is that seam; [`crate::kv::KvStore`] is the
//! on-disk implementation and [`MemoryStorage`] the in-process one.

use crate::kv::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Device-local storage for secrets (auth token, cached user record)
#[async_trait]
pub trait SecureStorage: Send + Sync {
    /// Read an entry, `None` if it was never written or has been deleted
    async fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Write an entry, replacing any previous value
    async fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Delete an entry. Deleting a missing entry succeeds.
    async fn delete_item(&self, key: &str) -> Result<()>;
}

/// In-memory secure storage
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    /// Whether the store holds no entries
    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

#[async_trait]
impl SecureStorage for MemoryStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.read().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.items.write().await.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete_item(&self, key: &str) -> Result<()> {
        self.items.write().await.remove(key);
        Ok(())
    }
}
