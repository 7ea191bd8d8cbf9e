//! Candidate interstitial items
//!
//! An [`Item`] is built by the caller for each candidate batch and is
//! immutable afterwards. Items compare by [`ItemId`] only.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::policy::DisplayPolicy;

/// Two-part interstitial identifier
///
/// `name` is the exact id. `group` is an optional wildcard-prefix component:
/// policy overrides registered for the group apply to every item in it, and
/// consecutive items of the same group swap in place without an animated
/// transition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    group: Option<String>,
}

impl ItemId {
    /// Identifier with no group
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group: None,
        }
    }

    /// Identifier belonging to a wildcard group
    pub fn grouped(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group: Some(group.into()),
        }
    }

    /// Exact id
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wildcard-prefix component, if any
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// Key used to decide whether a screen change is animated
    pub fn animation_group(&self) -> &str {
        self.group.as_deref().unwrap_or(&self.name)
    }

    /// Key under which the last-shown timestamp is persisted
    pub fn storage_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.group {
            Some(group) => write!(f, "{}*{}", group, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// User state handed to screen factories
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserState {
    /// Signed-in user, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Free-form attributes screens may render from
    #[serde(default)]
    pub attributes: HashMap<String, Value>,
}

impl UserState {
    /// State for a signed-in user
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Default::default()
        }
    }

    /// Add an attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

/// Produces the declarative body of an interstitial screen
///
/// Returning `None` means the screen cannot be built for this user; the item
/// is then left out of the batch.
pub trait ScreenFactory: Send + Sync {
    /// Build the screen body
    fn build(&self, user: &UserState) -> Option<Value>;
}

impl<F> ScreenFactory for F
where
    F: Fn(&UserState) -> Option<Value> + Send + Sync,
{
    fn build(&self, user: &UserState) -> Option<Value> {
        self(user)
    }
}

/// One candidate interstitial screen
#[derive(Clone)]
pub struct Item {
    id: ItemId,
    policy: DisplayPolicy,
    factory: Option<Arc<dyn ScreenFactory>>,
}

impl Item {
    /// Create an item without a screen factory
    ///
    /// Items without a factory are never queued.
    pub fn new(id: ItemId, policy: DisplayPolicy) -> Self {
        Self {
            id,
            policy,
            factory: None,
        }
    }

    /// Attach the screen factory
    pub fn with_factory<F>(mut self, factory: F) -> Self
    where
        F: ScreenFactory + 'static,
    {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// Item identifier
    pub fn id(&self) -> &ItemId {
        &self.id
    }

    /// Static display policy
    pub fn policy(&self) -> &DisplayPolicy {
        &self.policy
    }

    /// Screen factory, if one was supplied
    pub fn factory(&self) -> Option<&Arc<dyn ScreenFactory>> {
        self.factory.as_ref()
    }
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Item {}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Item")
            .field("id", &self.id)
            .field("policy", &self.policy)
            .field("has_factory", &self.factory.is_some())
            .finish()
    }
}
