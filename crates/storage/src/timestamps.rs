//! Persisted last-shown timestamps for interstitials
//!
//! The whole `{id: seconds}` mapping is stored as one JSON object under a
//! single key of the backing store. An in-memory copy answers queries; it is
//! rewritten only after the backing write has been attempted, so a successful
//! write always leaves both views identical.

use chrono::Duration;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::clock::{epoch_seconds, Clock};
use crate::kv::{KeyValueStore, KvError};

/// Default key holding the timestamp mapping
pub const DEFAULT_TIMESTAMPS_KEY: &str = "interstitials.displayTimestamps";

/// Timestamp store errors
#[derive(Debug, Error)]
pub enum TimestampStoreError {
    /// Backing store failure
    #[error("Storage error: {0}")]
    Storage(#[from] KvError),

    /// Mapping could not be encoded
    #[error("Encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Result type for timestamp store operations
pub type Result<T> = std::result::Result<T, TimestampStoreError>;

/// Durable mapping from item id to the last time it was shown
pub struct DisplayTimestampStore {
    backing: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    key: String,
    cache: RwLock<HashMap<String, f64>>,
}

impl DisplayTimestampStore {
    /// Open the store, loading any previously persisted mapping
    ///
    /// Unreadable or malformed data is logged and treated as empty: every
    /// item then counts as never shown, which can only cause an extra showing.
    pub fn open(
        backing: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        key: impl Into<String>,
    ) -> Self {
        let key = key.into();
        let cache = match backing.get_value(&key) {
            Ok(Some(value)) => match serde_json::from_value::<HashMap<String, f64>>(value) {
                Ok(map) => map,
                Err(e) => {
                    tracing::warn!(
                        "Discarding malformed display timestamps under {}: {}",
                        key,
                        e
                    );
                    HashMap::new()
                }
            },
            Ok(None) => HashMap::new(),
            Err(e) => {
                tracing::warn!("Failed to load display timestamps: {}", e);
                HashMap::new()
            }
        };

        tracing::debug!(entries = cache.len(), "Loaded display timestamps");

        Self {
            backing,
            clock,
            key,
            cache: RwLock::new(cache),
        }
    }

    /// Record (`shown == true`) or forget (`shown == false`) a showing of `id`
    ///
    /// The in-memory view is updated even if persisting fails; the error is
    /// returned so the caller can log it.
    pub fn set_display(&self, shown: bool, id: &str) -> Result<()> {
        let mut cache = self.cache.write();
        let mut next = cache.clone();
        if shown {
            next.insert(id.to_string(), epoch_seconds(self.clock.now()));
        } else {
            next.remove(id);
        }

        let outcome = self.persist(&next);
        *cache = next;
        outcome
    }

    /// Whether `id` counts as recently shown under `replay_delay`
    ///
    /// - `None` never gates on time.
    /// - A zero or negative delay gates forever once the item has been shown.
    /// - A positive delay gates until strictly more than the delay has elapsed.
    pub fn contains(&self, id: &str, replay_delay: Option<Duration>) -> bool {
        let Some(delay) = replay_delay else {
            return false;
        };
        let Some(last_shown) = self.cache.read().get(id).copied() else {
            return false;
        };

        if delay <= Duration::zero() {
            return true;
        }

        let elapsed = epoch_seconds(self.clock.now()) - last_shown;
        let delay_secs = delay.num_milliseconds() as f64 / 1000.0;
        elapsed <= delay_secs
    }

    /// Forget every recorded showing
    pub fn remove_all(&self) -> Result<()> {
        let mut cache = self.cache.write();
        cache.clear();

        self.backing.remove(&self.key)?;
        self.backing.flush()?;
        Ok(())
    }

    /// Number of items with a recorded showing
    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    /// Check if no showing has been recorded
    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }

    fn persist(&self, map: &HashMap<String, f64>) -> Result<()> {
        let value = serde_json::to_value(map)?;
        self.backing.set_value(&self.key, &value)?;
        self.backing.flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for DisplayTimestampStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplayTimestampStore")
            .field("key", &self.key)
            .field("entries", &self.len())
            .finish()
    }
}
