//! Key-value store for engine state
//!
//! This module provides the object-safe [`KeyValueStore`] trait the engine
//! persists through, a durable sled-backed [`KvStore`], and an in-process
//! [`MemoryStore`].

use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use sled::Db;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Key-value store error types
#[derive(Debug, Error)]
pub enum KvError {
    /// Sled database error
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid key
    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

/// Result type for key-value operations
pub type Result<T> = std::result::Result<T, KvError>;

/// Durable key-value capability injected into the engine
///
/// Values are JSON documents so a whole mapping can live under a single key.
pub trait KeyValueStore: Send + Sync {
    /// Get the value stored under `key`
    fn get_value(&self, key: &str) -> Result<Option<Value>>;

    /// Store `value` under `key`, replacing any previous value
    fn set_value(&self, key: &str, value: &Value) -> Result<()>;

    /// Remove `key`, returning whether it existed
    fn remove(&self, key: &str) -> Result<bool>;

    /// Make previous writes durable
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// Key-value store configuration
#[derive(Debug, Clone)]
pub struct KvConfig {
    /// Database path
    pub path: String,
    /// Cache capacity in bytes
    pub cache_capacity: u64,
    /// Enable compression
    pub use_compression: bool,
    /// Flush interval in milliseconds (None for immediate flush)
    pub flush_every_ms: Option<u64>,
}

impl Default for KvConfig {
    fn default() -> Self {
        Self {
            path: "interstitials_kv.db".to_string(),
            cache_capacity: 8 * 1024 * 1024, // 8MB
            use_compression: true,
            flush_every_ms: Some(500),
        }
    }
}

impl KvConfig {
    /// Create a new configuration with a custom path
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Configuration that flushes every write before returning
    pub fn durable(path: impl Into<String>) -> Self {
        Self::new(path).flush_every_ms(None)
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

/// Sled-backed key-value store
#[derive(Clone)]
pub struct KvStore {
    db: Arc<Db>,
    flush_on_write: bool,
}

impl KvStore {
    /// Create a new key-value store with configuration
    pub fn new(config: KvConfig) -> Result<Self> {
        let db = sled::Config::new()
            .path(&config.path)
            .cache_capacity(config.cache_capacity)
            .use_compression(config.use_compression)
            .flush_every_ms(config.flush_every_ms)
            .open()?;

        Ok(Self {
            db: Arc::new(db),
            flush_on_write: config.flush_every_ms.is_none(),
        })
    }

    /// Create an in-memory key-value store (for testing)
    pub fn in_memory() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;

        Ok(Self {
            db: Arc::new(db),
            flush_on_write: false,
        })
    }

    /// Get a typed value by key
    pub fn get<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        match self.db.get(validate_key(key)?)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Set a typed value by key
    pub fn set<T>(&self, key: &str, value: &T) -> Result<()>
    where
        T: Serialize,
    {
        let bytes = serde_json::to_vec(value)?;
        self.db.insert(validate_key(key)?, bytes)?;
        if self.flush_on_write {
            self.db.flush()?;
        }
        Ok(())
    }

    /// Get the number of keys in the store
    pub fn len(&self) -> usize {
        self.db.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }
}

impl KeyValueStore for KvStore {
    fn get_value(&self, key: &str) -> Result<Option<Value>> {
        self.get(key)
    }

    fn set_value(&self, key: &str, value: &Value) -> Result<()> {
        self.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let existed = self.db.remove(validate_key(key)?)?.is_some();
        if self.flush_on_write {
            self.db.flush()?;
        }
        Ok(existed)
    }

    fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

/// In-process key-value store
///
/// Nothing survives the process; useful for tests and guest sessions.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, Value>>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_value(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.read().get(validate_key(key)?).cloned())
    }

    fn set_value(&self, key: &str, value: &Value) -> Result<()> {
        self.entries
            .write()
            .insert(validate_key(key)?.to_string(), value.clone());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.entries.write().remove(validate_key(key)?).is_some())
    }
}

fn validate_key(key: &str) -> Result<&str> {
    if key.is_empty() {
        return Err(KvError::InvalidKey("key must not be empty".to_string()));
    }
    Ok(key)
}
