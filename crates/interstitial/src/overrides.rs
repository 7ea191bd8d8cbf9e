//! Remote display-policy overrides
//!
//! Overrides come from live configuration (feature flags, remote config) and
//! are consulted on every eligibility check, never cached by the engine.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Override for one item or one wildcard group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyOverride {
    /// `Some(false)` forces the item ineligible
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Replaces the static dismissability
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dismissable: Option<bool>,

    /// Replaces the static replay delay, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replay_delay: Option<f64>,
}

impl PolicyOverride {
    /// Override that disables the item
    pub fn disabled() -> Self {
        Self {
            enabled: Some(false),
            ..Default::default()
        }
    }

    /// Override that only replaces the replay delay
    pub fn replay_delay_secs(secs: f64) -> Self {
        Self {
            replay_delay: Some(secs),
            ..Default::default()
        }
    }
}

/// Lookup step used when resolving an override
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideKey<'a> {
    /// Exact item name
    Exact(&'a str),
    /// Wildcard group prefix
    Prefix(&'a str),
}

/// Read-only source of policy overrides
pub trait PolicyOverrideSource: Send + Sync {
    /// Look up the override registered under `key`
    fn lookup(&self, key: OverrideKey<'_>) -> Option<PolicyOverride>;
}

/// Source with no overrides
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOverrides;

impl PolicyOverrideSource for NoOverrides {
    fn lookup(&self, _key: OverrideKey<'_>) -> Option<PolicyOverride> {
        None
    }
}

/// Mutable in-process override table
///
/// Writers may update it at any time; the next eligibility check sees the
/// change.
#[derive(Debug, Default)]
pub struct StaticOverrides {
    exact: RwLock<HashMap<String, PolicyOverride>>,
    prefix: RwLock<HashMap<String, PolicyOverride>>,
}

impl StaticOverrides {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a remote-config JSON object
    ///
    /// Keys ending in `*` register a wildcard group (`"terms*"` applies to the
    /// `terms` group); every other key is an exact item name.
    pub fn from_json(value: &Value) -> Result<Self, serde_json::Error> {
        let table = Self::new();
        table.replace_from_json(value)?;
        Ok(table)
    }

    /// Replace every entry from a remote-config JSON object
    pub fn replace_from_json(&self, value: &Value) -> Result<(), serde_json::Error> {
        let entries: HashMap<String, PolicyOverride> = serde_json::from_value(value.clone())?;

        let mut exact = HashMap::new();
        let mut prefix = HashMap::new();
        for (key, entry) in entries {
            match key.strip_suffix('*') {
                Some(group) => prefix.insert(group.to_string(), entry),
                None => exact.insert(key, entry),
            };
        }

        *self.exact.write() = exact;
        *self.prefix.write() = prefix;
        Ok(())
    }

    /// Register an override for an exact item name
    pub fn insert_exact(&self, name: impl Into<String>, entry: PolicyOverride) {
        self.exact.write().insert(name.into(), entry);
    }

    /// Register an override for a wildcard group
    pub fn insert_prefix(&self, group: impl Into<String>, entry: PolicyOverride) {
        self.prefix.write().insert(group.into(), entry);
    }

    /// Drop every override
    pub fn clear(&self) {
        self.exact.write().clear();
        self.prefix.write().clear();
    }
}

impl PolicyOverrideSource for StaticOverrides {
    fn lookup(&self, key: OverrideKey<'_>) -> Option<PolicyOverride> {
        match key {
            OverrideKey::Exact(name) => self.exact.read().get(name).cloned(),
            OverrideKey::Prefix(group) => self.prefix.read().get(group).cloned(),
        }
    }
}
