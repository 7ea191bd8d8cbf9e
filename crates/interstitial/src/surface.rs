//! Presentation surface capability
//!
//! The surface renders screens; the engine only tells it what to show and
//! when to hide. Show and hide are asynchronous: the surface calls the
//! supplied [`TransitionDone`] once its animation has finished, possibly
//! synchronously from inside `show`/`hide`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::item::ItemId;

/// Callback the surface invokes when a transition has finished
pub type TransitionDone = Box<dyn FnOnce() + Send>;

/// Progress through the current session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Completed items
    pub index: usize,
    /// Items tracked this session
    pub total: usize,
}

/// Screen handed to the surface
///
/// `item_id` identifies the item when the screen reports completion back
/// through [`crate::controller::PresentationController::did_complete`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentedScreen {
    /// Item this screen belongs to
    pub item_id: ItemId,
    /// Whether the user may dismiss it
    pub dismissable: bool,
    /// Session progress when presented
    pub progress: Progress,
    /// Declarative screen body from the item's factory
    pub body: Value,
}

/// Surface that displays interstitial screens
///
/// Implementations must not call back into the controller from
/// [`PresentationSurface::is_currently_showing`].
pub trait PresentationSurface: Send + Sync {
    /// Show `screen`, replacing whatever is on display
    fn show(&self, screen: PresentedScreen, animated: bool, done: TransitionDone);

    /// Hide the surface entirely
    fn hide(&self, done: TransitionDone);

    /// Whether the screen for `id` is currently visible
    fn is_currently_showing(&self, id: &ItemId) -> bool;
}
