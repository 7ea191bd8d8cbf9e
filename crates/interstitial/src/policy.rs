//! Display policy and eligibility
//!
//! Eligibility is a pure read over the item, the override source, and the
//! timestamp store. Overrides are merged on every call.

use chrono::Duration;
use std::fmt;
use std::sync::Arc;
use storage::DisplayTimestampStore;

use crate::item::Item;
use crate::overrides::{OverrideKey, PolicyOverrideSource};

/// Caller-supplied gate evaluated at query time
pub type Precondition = Arc<dyn Fn() -> bool + Send + Sync>;

/// Static display policy carried by an item
#[derive(Clone)]
pub struct DisplayPolicy {
    /// Whether the user may dismiss the screen
    pub is_dismissable: bool,
    /// Replay gate; see [`DisplayTimestampStore::contains`]
    pub replay_delay: Option<Duration>,
    precondition: Precondition,
}

impl DisplayPolicy {
    /// Dismissable policy with no replay gate
    pub fn always() -> Self {
        Self {
            is_dismissable: true,
            replay_delay: None,
            precondition: Arc::new(|| true),
        }
    }

    /// Shown at most once, ever
    pub fn once() -> Self {
        Self::always().replay_after(Duration::zero())
    }

    /// Shown again once `delay` has elapsed
    pub fn every(delay: Duration) -> Self {
        Self::always().replay_after(delay)
    }

    /// Set the replay delay
    pub fn replay_after(mut self, delay: Duration) -> Self {
        self.replay_delay = Some(delay);
        self
    }

    /// Set dismissability
    pub fn dismissable(mut self, dismissable: bool) -> Self {
        self.is_dismissable = dismissable;
        self
    }

    /// Gate eligibility on `check`
    pub fn when<F>(mut self, check: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.precondition = Arc::new(check);
        self
    }

    /// Evaluate the precondition
    pub fn precondition_holds(&self) -> bool {
        (self.precondition)()
    }
}

impl Default for DisplayPolicy {
    fn default() -> Self {
        Self::always()
    }
}

impl fmt::Debug for DisplayPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisplayPolicy")
            .field("is_dismissable", &self.is_dismissable)
            .field("replay_delay", &self.replay_delay)
            .finish_non_exhaustive()
    }
}

/// Policy after overrides have been applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPolicy {
    /// False when an override disabled the item
    pub enabled: bool,
    /// Effective dismissability
    pub is_dismissable: bool,
    /// Effective replay delay
    pub replay_delay: Option<Duration>,
}

/// Merge the item's static policy with any live override
///
/// The exact item name is looked up first; the wildcard group is consulted
/// only when no exact override exists.
pub fn resolve_policy(item: &Item, overrides: &dyn PolicyOverrideSource) -> ResolvedPolicy {
    let id = item.id();
    let policy = item.policy();

    let found = overrides
        .lookup(OverrideKey::Exact(id.name()))
        .or_else(|| overrides.lookup(OverrideKey::Prefix(id.group()?)));

    let mut resolved = ResolvedPolicy {
        enabled: true,
        is_dismissable: policy.is_dismissable,
        replay_delay: policy.replay_delay,
    };

    if let Some(found) = found {
        if let Some(enabled) = found.enabled {
            resolved.enabled = enabled;
        }
        if let Some(dismissable) = found.dismissable {
            resolved.is_dismissable = dismissable;
        }
        if let Some(secs) = found.replay_delay {
            match delay_from_secs(secs) {
                Some(delay) => resolved.replay_delay = Some(delay),
                None => tracing::warn!(item = %id, secs, "Ignoring invalid replay delay override"),
            }
        }
    }

    resolved
}

/// Convert override seconds to a delay, saturating at the representable range
///
/// Returns `None` for NaN and infinities.
fn delay_from_secs(secs: f64) -> Option<Duration> {
    if !secs.is_finite() {
        return None;
    }
    // Float casts saturate at i64::MIN, which is one below the smallest delay.
    let millis = ((secs * 1000.0).round() as i64).max(-i64::MAX);
    Duration::try_milliseconds(millis)
}

/// Resolve and check an item, returning its effective policy when eligible
pub fn evaluate(
    item: &Item,
    timestamps: &DisplayTimestampStore,
    overrides: &dyn PolicyOverrideSource,
) -> Option<ResolvedPolicy> {
    let resolved = resolve_policy(item, overrides);

    if !resolved.enabled {
        tracing::debug!(item = %item.id(), "Interstitial disabled by override");
        return None;
    }
    if !item.policy().precondition_holds() {
        tracing::debug!(item = %item.id(), "Interstitial precondition not met");
        return None;
    }
    if timestamps.contains(&item.id().storage_key(), resolved.replay_delay) {
        tracing::debug!(item = %item.id(), "Interstitial shown too recently");
        return None;
    }

    Some(resolved)
}

/// Whether `item` may be queued right now
pub fn is_eligible(
    item: &Item,
    timestamps: &DisplayTimestampStore,
    overrides: &dyn PolicyOverrideSource,
) -> bool {
    evaluate(item, timestamps, overrides).is_some()
}
