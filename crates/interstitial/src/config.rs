//! Controller configuration

use serde::{Deserialize, Serialize};
use storage::timestamps::DEFAULT_TIMESTAMPS_KEY;

/// Default lifecycle event buffer
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Controller configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ControllerConfig {
    /// Key holding the persisted last-shown mapping
    pub timestamps_key: String,
    /// Capacity of the lifecycle event channel
    pub event_capacity: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            timestamps_key: DEFAULT_TIMESTAMPS_KEY.to_string(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl ControllerConfig {
    /// Set the timestamps key
    pub fn timestamps_key(mut self, key: impl Into<String>) -> Self {
        self.timestamps_key = key.into();
        self
    }

    /// Set the event channel capacity (at least 1)
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }
}
