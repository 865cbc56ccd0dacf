//! On-disk key-value store for device secrets
//!
//! Entries live in a sled database under `scope:key` names. The `"secure"`
//! scope backs the [`SecureStorage`] implementation used for the auth token
//! and the cached user record.

use crate::secure::SecureStorage;
use async_trait::async_trait;
use sled::Db;
use std::sync::Arc;
use thiserror::Error;

/// Scope for entries written through [`SecureStorage`]
const SECURE_SCOPE: &str = "secure";

const SEPARATOR: char = ':';

/// Key-value store error types
#[derive(Debug, Error)]
pub enum KvError {
    /// Sled database error
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    /// Invalid scope or key
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Stored bytes are not valid UTF-8
    #[error("Corrupt entry: {0}")]
    Corrupt(String),

    /// Backend unavailable (locked keychain, revoked permission, ...)
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Result type for key-value operations
pub type Result<T> = std::result::Result<T, KvError>;

/// Key-value store configuration
#[derive(Debug, Clone)]
pub struct KvConfig {
    /// Database path
    pub path: String,
    /// Cache capacity in bytes
    pub cache_capacity: u64,
    /// Enable compression
    pub use_compression: bool,
    /// Flush interval in milliseconds (None for flush on every write)
    pub flush_every_ms: Option<u64>,
}

impl Default for KvConfig {
    fn default() -> Self {
        Self {
            path: "lingua_secure.db".to_string(),
            cache_capacity: 1024 * 1024, // 1MB
            use_compression: false,
            flush_every_ms: None,
        }
    }
}

impl KvConfig {
    /// Create a configuration for the database at `path`
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into(), ..Default::default() }
    }

    /// Set cache capacity in bytes
    pub fn cache_capacity(mut self, bytes: u64) -> Self {
        self.cache_capacity = bytes;
        self
    }

    /// Enable or disable compression
    pub fn use_compression(mut self, enabled: bool) -> Self {
        self.use_compression = enabled;
        self
    }

    /// Set flush interval in milliseconds
    pub fn flush_every_ms(mut self, ms: Option<u64>) -> Self {
        self.flush_every_ms = ms;
        self
    }
}

/// Sled-backed store of scoped string entries
#[derive(Clone)]
pub struct KvStore {
    db: Arc<Db>,
    flush_on_write: bool,
}

impl std::fmt::Debug for KvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvStore")
            .field("entries", &self.db.len())
            .field("flush_on_write", &self.flush_on_write)
            .finish()
    }
}

impl KvStore {
    /// Open (or create) the database described by `config`
    pub fn new(config: KvConfig) -> Result<Self> {
        let db = sled::Config::new()
            .path(&config.path)
            .cache_capacity(config.cache_capacity)
            .use_compression(config.use_compression)
            .flush_every_ms(config.flush_every_ms)
            .open()?;

        tracing::debug!(path = %config.path, "opened key-value store");

        Ok(Self {
            db: Arc::new(db),
            flush_on_write: config.flush_every_ms.is_none(),
        })
    }

    /// Create a temporary store that is deleted on drop
    pub fn in_memory() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db: Arc::new(db), flush_on_write: false })
    }

    /// Read an entry
    pub fn get(&self, scope: &str, key: &str) -> Result<Option<String>> {
        let name = scoped_key(scope, key)?;
        match self.db.get(name.as_bytes())? {
            Some(bytes) => String::from_utf8(bytes.to_vec())
                .map(Some)
                .map_err(|_| KvError::Corrupt(name)),
            None => Ok(None),
        }
    }

    /// Write an entry, replacing any previous value
    pub fn set(&self, scope: &str, key: &str, value: &str) -> Result<()> {
        let name = scoped_key(scope, key)?;
        self.db.insert(name.as_bytes(), value.as_bytes())?;
        if self.flush_on_write {
            self.db.flush()?;
        }
        Ok(())
    }

    /// Remove an entry, returning whether it existed
    pub fn remove(&self, scope: &str, key: &str) -> Result<bool> {
        let name = scoped_key(scope, key)?;
        let removed = self.db.remove(name.as_bytes())?.is_some();
        if removed && self.flush_on_write {
            self.db.flush()?;
        }
        Ok(removed)
    }
}

fn scoped_key(scope: &str, key: &str) -> Result<String> {
    if scope.is_empty() || key.is_empty() || scope.contains(SEPARATOR) || key.contains(SEPARATOR) {
        return Err(KvError::InvalidKey(format!("{}{}{}", scope, SEPARATOR, key)));
    }
    Ok(format!("{}{}{}", scope, SEPARATOR, key))
}

#[async_trait]
impl SecureStorage for KvStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.get(SECURE_SCOPE, key)
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.set(SECURE_SCOPE, key, value)
    }

    async fn delete_item(&self, key: &str) -> Result<()> {
        self.remove(SECURE_SCOPE, key)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_get_remove() {
        let kv = KvStore::in_memory().unwrap();
        kv.set("device", "locale", "fr").unwrap();

        assert_eq!(kv.get("device", "locale").unwrap().as_deref(), Some("fr"));
        assert!(kv.get("device", "theme").unwrap().is_none());

        assert!(kv.remove("device", "locale").unwrap());
        assert!(!kv.remove("device", "locale").unwrap());
    }

    #[test]
    fn test_scopes_are_isolated() {
        let kv = KvStore::in_memory().unwrap();
        kv.set("secure", "auth_token", "t").unwrap();
        kv.set("secure", "user_data", "u").unwrap();
        kv.set("device", "auth_token", "other").unwrap();

        assert_eq!(kv.get("secure", "auth_token").unwrap().as_deref(), Some("t"));
        assert_eq!(kv.get("device", "auth_token").unwrap().as_deref(), Some("other"));
    }

    #[test]
    fn test_invalid_keys_rejected() {
        let kv = KvStore::in_memory().unwrap();
        assert!(matches!(kv.set("secure", "a:b", "x"), Err(KvError::InvalidKey(_))));
        assert!(matches!(kv.set("", "token", "x"), Err(KvError::InvalidKey(_))));
        assert!(matches!(kv.get("secure", ""), Err(KvError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_secure_storage_roundtrip() {
        let kv = KvStore::in_memory().unwrap();

        kv.set_item("auth_token", "abc123").await.unwrap();
        assert_eq!(kv.get_item("auth_token").await.unwrap(), Some("abc123".to_string()));
        assert_eq!(kv.get("secure", "auth_token").unwrap().as_deref(), Some("abc123"));

        kv.delete_item("auth_token").await.unwrap();
        assert_eq!(kv.get_item("auth_token").await.unwrap(), None);

        // Deleting a missing entry is not an error
        kv.delete_item("auth_token").await.unwrap();
    }

    #[tokio::test]
    async fn test_secure_storage_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("secure.db");
        let path = path.to_string_lossy().to_string();

        {
            let kv = KvStore::new(KvConfig::new(path.clone())).unwrap();
            kv.set_item("auth_token", "persisted").await.unwrap();
        }

        let kv = KvStore::new(KvConfig::new(path)).unwrap();
        assert_eq!(kv.get_item("auth_token").await.unwrap(), Some("persisted".to_string()));
    }

    #[test]
    fn test_config_builder() {
        let config = KvConfig::new("custom.db")
            .cache_capacity(1024)
            .use_compression(true)
            .flush_every_ms(Some(250));

        assert_eq!(config.path, "custom.db");
        assert_eq!(config.cache_capacity, 1024);
        assert!(config.use_compression);
        assert_eq!(config.flush_every_ms, Some(250));
    }
}
