//! Lifecycle callbacks and broadcast events

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::item::{Item, ItemId};

/// Events broadcast as the controller moves through a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum InterstitialEvent {
    /// An item was handed to the surface
    Shown {
        /// The item
        id: ItemId,
    },
    /// The user finished an item
    Completed {
        /// The item
        id: ItemId,
    },
    /// A newer batch replaced an unfinished item
    Superseded {
        /// The item
        id: ItemId,
        /// True when the item never reached the screen
        never_shown: bool,
    },
    /// Every item of the session is done
    AllDismissed,
    /// State was reset (account switch, logout)
    Reset,
}

type ShowCallback = Box<dyn Fn(&Item) + Send + Sync>;
type DismissCallback = Box<dyn Fn() + Send + Sync>;

/// Owner callbacks
///
/// Callbacks run outside the controller's lock and may call back into it.
#[derive(Default)]
pub struct Callbacks {
    on_show: Option<ShowCallback>,
    on_all_dismissed: Option<DismissCallback>,
}

impl Callbacks {
    /// No callbacks
    pub fn new() -> Self {
        Self::default()
    }

    /// Called each time an item is handed to the surface
    pub fn on_show<F>(mut self, f: F) -> Self
    where
        F: Fn(&Item) + Send + Sync + 'static,
    {
        self.on_show = Some(Box::new(f));
        self
    }

    /// Called once when a session's last item is done
    pub fn on_all_dismissed<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_all_dismissed = Some(Box::new(f));
        self
    }

    pub(crate) fn shown(&self, item: &Item) {
        if let Some(f) = &self.on_show {
            f(item);
        }
    }

    pub(crate) fn all_dismissed(&self) {
        if let Some(f) = &self.on_all_dismissed {
            f();
        }
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_show", &self.on_show.is_some())
            .field("on_all_dismissed", &self.on_all_dismissed.is_some())
            .finish()
    }
}
