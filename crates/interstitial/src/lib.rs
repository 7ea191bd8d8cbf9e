//! Interstitial presentation engine
//!
//! Sequences full-screen interstitials (legal notices, onboarding prompts,
//! re-engagement screens) shown between primary app flows.
//!
//! # Modules
//!
//! - [`item`] - Candidate items, identifiers, and screen factories
//! - [`policy`] - Display policy, override resolution, and eligibility
//! - [`overrides`] - Live policy override sources
//! - [`queue`] - Pending presentation queue
//! - [`session`] - Per-session completion tracking
//! - [`surface`] - Presentation surface capability
//! - [`events`] - Lifecycle callbacks and broadcast events
//! - [`config`] - Controller configuration
//! - [`controller`] - The presentation state machine
//!
//! # Example
//!
//! ```rust
//! use interstitial::controller::PresentationController;
//! use interstitial::item::{Item, ItemId, UserState};
//! use interstitial::policy::DisplayPolicy;
//! use interstitial::surface::{PresentationSurface, PresentedScreen, TransitionDone};
//! use std::sync::Arc;
//!
//! struct Headless;
//!
//! impl PresentationSurface for Headless {
//!     fn show(&self, _screen: PresentedScreen, _animated: bool, done: TransitionDone) {
//!         done();
//!     }
//!     fn hide(&self, done: TransitionDone) {
//!         done();
//!     }
//!     fn is_currently_showing(&self, _id: &ItemId) -> bool {
//!         false
//!     }
//! }
//!
//! let controller = PresentationController::builder(Arc::new(Headless)).build();
//! let welcome = Item::new(ItemId::new("welcome"), DisplayPolicy::once())
//!     .with_factory(|_user: &UserState| Some(serde_json::json!({"title": "Hi"})));
//!
//! controller.set_interstitials(vec![welcome]);
//! assert_eq!(controller.current(), Some(ItemId::new("welcome")));
//!
//! controller.did_complete(&ItemId::new("welcome"));
//! assert!(controller.current().is_none());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod controller;
pub mod events;
pub mod item;
pub mod overrides;
pub mod policy;
pub mod queue;
pub mod session;
pub mod surface;

pub use config::ControllerConfig;
pub use controller::{
    ControllerBuilder, PresentOutcome, PresentationController, SurfaceState, Transition,
};
pub use events::{Callbacks, InterstitialEvent};
pub use item::{Item, ItemId, ScreenFactory, UserState};
pub use overrides::{
    NoOverrides, OverrideKey, PolicyOverride, PolicyOverrideSource, StaticOverrides,
};
pub use policy::{DisplayPolicy, ResolvedPolicy};
pub use surface::{PresentationSurface, PresentedScreen, Progress, TransitionDone};
