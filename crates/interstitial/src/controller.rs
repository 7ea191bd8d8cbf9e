//! Interstitial presentation controller
//!
//! The controller owns the queue and the session tracker and drives a
//! [`PresentationSurface`]. All state lives behind one mutex. Work that leaves
//! the controller (surface calls, owner callbacks, event broadcast) is
//! collected as effects while the lock is held and executed after it is
//! released, so surfaces and callbacks may call straight back in.
//!
//! Transitions are never interrupted: a request that arrives while a show
//! animation is running is parked as a follow-up and replayed once the
//! surface reports the animation finished. Requests made while the hide
//! animation runs are picked up when the hide completes.

use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use storage::{Clock, DisplayTimestampStore, KeyValueStore, MemoryStore, SystemClock};
use tokio::sync::broadcast;

use crate::config::ControllerConfig;
use crate::events::{Callbacks, InterstitialEvent};
use crate::item::{Item, ItemId, UserState};
use crate::overrides::{NoOverrides, PolicyOverrideSource};
use crate::policy;
use crate::queue::{ItemQueue, QueuedItem};
use crate::session::SessionTracker;
use crate::surface::{PresentationSurface, PresentedScreen, Progress};

/// Whether a show or hide animation is still running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Animation in flight
    Animating,
    /// Surface is at rest
    Settled,
}

/// Observable state of the presentation surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceState {
    /// Nothing queued or on screen
    Idle,
    /// Surface is showing `current`
    Presenting {
        /// Item on screen
        current: ItemId,
        /// Show animation state
        transition: Transition,
    },
    /// Hide animation in flight
    Dismissing,
}

/// Result of [`PresentationController::present_if_needed`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresentOutcome {
    /// Queue was empty
    NothingToDo,
    /// The head of the queue is already on screen
    AlreadyShowing(ItemId),
    /// A new screen was handed to the surface
    Presented(ItemId),
    /// A transition is in flight; the request will be replayed afterwards
    Deferred,
}

/// Work parked until the running show animation finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Followup {
    Present,
    Advance,
    Dismiss { notify: bool },
}

/// Side effect to run once the state lock is released
enum Effect {
    Show {
        screen: PresentedScreen,
        animated: bool,
    },
    Hide,
    Emit(InterstitialEvent),
    NotifyShown(Item),
    NotifyAllDismissed,
}

struct Env {
    surface: Arc<dyn PresentationSurface>,
    timestamps: DisplayTimestampStore,
    overrides: Arc<dyn PolicyOverrideSource>,
    callbacks: Callbacks,
    events: broadcast::Sender<InterstitialEvent>,
}

struct EngineState {
    surface: SurfaceState,
    queue: ItemQueue,
    session: SessionTracker,
    followup: Option<Followup>,
    user: UserState,
}

impl EngineState {
    fn new(user: UserState) -> Self {
        Self {
            surface: SurfaceState::Idle,
            queue: ItemQueue::new(),
            session: SessionTracker::new(),
            followup: None,
            user,
        }
    }

    fn showing(&self) -> Option<&ItemId> {
        match &self.surface {
            SurfaceState::Presenting { current, .. } => Some(current),
            _ => None,
        }
    }

    fn is_animating(&self) -> bool {
        matches!(
            self.surface,
            SurfaceState::Presenting {
                transition: Transition::Animating,
                ..
            }
        )
    }

    fn accept_batch(&mut self, batch: Vec<QueuedItem>, env: &Env, fx: &mut Vec<Effect>) {
        for superseded in self.session.supersede_all() {
            fx.push(Effect::Emit(InterstitialEvent::Superseded {
                id: superseded.id,
                never_shown: superseded.never_shown,
            }));
        }

        self.queue.replace(batch);
        for queued in self.queue.iter() {
            self.session.add_pending(queued.id().clone());
        }

        if self.queue.is_empty() {
            let notify = self.session.is_active();
            self.drive(Followup::Dismiss { notify }, env, fx);
        } else {
            self.drive(Followup::Present, env, fx);
        }
    }

    /// Run `followup` now, or park it behind a running transition
    fn drive(&mut self, followup: Followup, env: &Env, fx: &mut Vec<Effect>) -> PresentOutcome {
        match self.surface {
            SurfaceState::Presenting {
                transition: Transition::Animating,
                ..
            } => {
                self.followup = Some(match (self.followup, followup) {
                    (Some(Followup::Advance), Followup::Present) => Followup::Advance,
                    (_, next) => next,
                });
                PresentOutcome::Deferred
            }
            SurfaceState::Dismissing => {
                if let Followup::Dismiss { notify } = followup {
                    self.dismiss_if_needed(notify, fx);
                }
                PresentOutcome::Deferred
            }
            _ => self.run(followup, env, fx),
        }
    }

    fn run(&mut self, followup: Followup, env: &Env, fx: &mut Vec<Effect>) -> PresentOutcome {
        match followup {
            Followup::Present => self.present_if_needed(env, fx),
            Followup::Advance => {
                let outcome = self.present_if_needed(env, fx);
                if outcome == PresentOutcome::NothingToDo {
                    self.dismiss_if_needed(true, fx);
                }
                outcome
            }
            Followup::Dismiss { notify } => {
                self.dismiss_if_needed(notify, fx);
                PresentOutcome::NothingToDo
            }
        }
    }

    fn present_if_needed(&mut self, env: &Env, fx: &mut Vec<Effect>) -> PresentOutcome {
        if self.is_animating() || self.surface == SurfaceState::Dismissing {
            return PresentOutcome::Deferred;
        }

        let Some(head) = self.queue.pop() else {
            return PresentOutcome::NothingToDo;
        };
        let id = head.id().clone();

        let (animated, same_item) = match self.showing() {
            Some(current) => (
                current.animation_group() != id.animation_group(),
                *current == id,
            ),
            None => (true, false),
        };

        self.session.mark_shown(&id);
        if same_item && env.surface.is_currently_showing(&id) {
            tracing::debug!(item = %id, "Interstitial already on screen");
            return PresentOutcome::AlreadyShowing(id);
        }

        let screen = PresentedScreen {
            item_id: id.clone(),
            dismissable: head.dismissable,
            progress: self.session.progress(),
            body: head.body,
        };

        tracing::info!(item = %id, animated, "Presenting interstitial");
        self.surface = SurfaceState::Presenting {
            current: id.clone(),
            transition: Transition::Animating,
        };
        fx.push(Effect::Emit(InterstitialEvent::Shown { id: id.clone() }));
        fx.push(Effect::NotifyShown(head.item));
        fx.push(Effect::Show {
            screen,
            animated: animated && !same_item,
        });

        PresentOutcome::Presented(id)
    }

    fn dismiss_if_needed(&mut self, notify: bool, fx: &mut Vec<Effect>) {
        self.queue.clear();
        self.followup = None;

        if notify && self.session.claim_dismissal() {
            tracing::info!("All interstitials dismissed");
            fx.push(Effect::Emit(InterstitialEvent::AllDismissed));
            fx.push(Effect::NotifyAllDismissed);
        }

        match self.surface {
            SurfaceState::Presenting { .. } => {
                tracing::debug!("Hiding interstitial surface");
                self.surface = SurfaceState::Dismissing;
                fx.push(Effect::Hide);
            }
            SurfaceState::Dismissing => {}
            SurfaceState::Idle => self.session.clear(),
        }
    }

    fn complete(&mut self, id: &ItemId, env: &Env, fx: &mut Vec<Effect>) {
        if !self.session.mark_complete(id) {
            tracing::debug!(item = %id, "Ignoring completion for item outside the session");
            return;
        }

        if let Err(e) = env.timestamps.set_display(true, &id.storage_key()) {
            tracing::warn!(item = %id, "Failed to persist display timestamp: {}", e);
        }
        fx.push(Effect::Emit(InterstitialEvent::Completed {
            id: id.clone(),
        }));

        if self.showing() != Some(id) {
            // The screen was already replaced or hidden; nothing to advance.
            tracing::debug!(item = %id, "Completion for a screen no longer on display");
            return;
        }

        self.drive(Followup::Advance, env, fx);
    }

    fn show_finished(&mut self, env: &Env, fx: &mut Vec<Effect>) {
        let SurfaceState::Presenting { transition, .. } = &mut self.surface else {
            return;
        };
        if *transition == Transition::Settled {
            return;
        }
        *transition = Transition::Settled;

        if let Some(followup) = self.followup.take() {
            self.run(followup, env, fx);
        }
    }

    fn hide_finished(&mut self, env: &Env, fx: &mut Vec<Effect>) {
        if self.surface != SurfaceState::Dismissing {
            return;
        }
        self.surface = SurfaceState::Idle;
        self.session.clear();

        if !self.queue.is_empty() {
            // A batch arrived while hiding: it starts a fresh session.
            for queued in self.queue.iter() {
                self.session.add_pending(queued.id().clone());
            }
            self.present_if_needed(env, fx);
        }
    }
}

struct Shared {
    state: Mutex<EngineState>,
    env: Env,
}

/// Sequences interstitial screens onto a presentation surface
///
/// Cloning yields another handle to the same controller.
///
/// # Example
///
/// ```no_run
/// use interstitial::{Callbacks, ControllerConfig, PresentationController};
/// # use interstitial::surface::PresentationSurface;
/// # use std::sync::Arc;
/// # fn surface() -> Arc<dyn PresentationSurface> { unimplemented!() }
/// use storage::{KvConfig, KvStore};
///
/// let kv = KvStore::new(KvConfig::durable("interstitials.db")).unwrap();
/// let controller = PresentationController::builder(surface())
///     .backing(Arc::new(kv))
///     .config(ControllerConfig::default().timestamps_key("account:alice:interstitials"))
///     .callbacks(Callbacks::new().on_all_dismissed(|| println!("back to the app")))
///     .build();
///
/// let events = controller.subscribe();
/// ```
#[derive(Clone)]
pub struct PresentationController {
    shared: Arc<Shared>,
}

impl PresentationController {
    /// Start building a controller for `surface`
    pub fn builder(surface: Arc<dyn PresentationSurface>) -> ControllerBuilder {
        ControllerBuilder::new(surface)
    }

    /// Supply a new candidate batch
    ///
    /// Candidates are filtered through the display policy; the survivors
    /// replace the queue and supersede every unfinished item of the current
    /// session.
    pub fn set_interstitials(&self, candidates: Vec<Item>) {
        let user = self.shared.state.lock().user.clone();
        let total = candidates.len();
        let batch: Vec<QueuedItem> = candidates
            .into_iter()
            .filter_map(|item| self.admit(item, &user))
            .collect();

        tracing::debug!(
            candidates = total,
            eligible = batch.len(),
            "Accepted interstitial batch"
        );

        self.with_state(|state, env, fx| state.accept_batch(batch, env, fx));
    }

    /// Report that the screen for `id` finished
    pub fn did_complete(&self, id: &ItemId) {
        self.with_state(|state, env, fx| state.complete(id, env, fx));
    }

    /// Present the head of the queue unless it is already on screen
    pub fn present_if_needed(&self) -> PresentOutcome {
        self.with_state(|state, env, fx| state.drive(Followup::Present, env, fx))
    }

    /// Drop the queue and hide the surface
    ///
    /// With `notify`, the "all dismissed" callback fires if the session has not
    /// already reported it.
    pub fn dismiss_if_needed(&self, notify: bool) {
        self.with_state(|state, env, fx| {
            state.drive(Followup::Dismiss { notify }, env, fx);
        });
    }

    /// Forget all history and state (account switch, logout)
    pub fn reset(&self) {
        self.with_state(|state, env, fx| {
            tracing::info!("Resetting interstitial state");
            state.queue.clear();
            state.session.clear();
            if let Err(e) = env.timestamps.remove_all() {
                tracing::warn!("Failed to clear display timestamps: {}", e);
            }
            fx.push(Effect::Emit(InterstitialEvent::Reset));
            state.drive(Followup::Dismiss { notify: false }, env, fx);
        });
    }

    /// Replace the user state handed to screen factories
    pub fn set_user_state(&self, user: UserState) {
        self.shared.state.lock().user = user;
    }

    /// Whether `item` is eligible right now
    pub fn is_eligible(&self, item: &Item) -> bool {
        let env = &self.shared.env;
        policy::is_eligible(item, &env.timestamps, env.overrides.as_ref())
    }

    /// Current surface state
    pub fn state(&self) -> SurfaceState {
        self.shared.state.lock().surface.clone()
    }

    /// Item on screen, if any
    pub fn current(&self) -> Option<ItemId> {
        self.shared.state.lock().showing().cloned()
    }

    /// Identifiers waiting in the queue
    pub fn queued(&self) -> Vec<ItemId> {
        self.shared.state.lock().queue.ids()
    }

    /// Session progress
    pub fn progress(&self) -> Progress {
        self.shared.state.lock().session.progress()
    }

    /// Whether a session is in progress
    pub fn is_session_active(&self) -> bool {
        self.shared.state.lock().session.is_active()
    }

    /// The timestamp store backing eligibility
    pub fn timestamps(&self) -> &DisplayTimestampStore {
        &self.shared.env.timestamps
    }

    /// Subscribe to lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<InterstitialEvent> {
        self.shared.env.events.subscribe()
    }

    fn admit(&self, item: Item, user: &UserState) -> Option<QueuedItem> {
        let env = &self.shared.env;

        let Some(factory) = item.factory().cloned() else {
            tracing::warn!(item = %item.id(), "Dropping interstitial without a screen factory");
            return None;
        };
        let resolved = policy::evaluate(&item, &env.timestamps, env.overrides.as_ref())?;
        let Some(body) = factory.build(user) else {
            tracing::warn!(item = %item.id(), "Screen factory produced no screen");
            return None;
        };

        Some(QueuedItem {
            item,
            dismissable: resolved.is_dismissable,
            body,
        })
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut EngineState, &Env, &mut Vec<Effect>) -> T) -> T {
        let mut fx = Vec::new();
        let result = {
            let mut state = self.shared.state.lock();
            f(&mut state, &self.shared.env, &mut fx)
        };
        self.execute(fx);
        result
    }

    fn execute(&self, effects: Vec<Effect>) {
        let env = &self.shared.env;
        for effect in effects {
            match effect {
                Effect::Show { screen, animated } => {
                    let handle = Arc::downgrade(&self.shared);
                    env.surface.show(
                        screen,
                        animated,
                        Box::new(move || {
                            Self::on_transition(&handle, EngineState::show_finished);
                        }),
                    );
                }
                Effect::Hide => {
                    let handle = Arc::downgrade(&self.shared);
                    env.surface.hide(Box::new(move || {
                        Self::on_transition(&handle, EngineState::hide_finished);
                    }));
                }
                Effect::Emit(event) => {
                    // No subscribers is fine.
                    let _ = env.events.send(event);
                }
                Effect::NotifyShown(item) => env.callbacks.shown(&item),
                Effect::NotifyAllDismissed => env.callbacks.all_dismissed(),
            }
        }
    }

    fn on_transition(handle: &Weak<Shared>, step: fn(&mut EngineState, &Env, &mut Vec<Effect>)) {
        if let Some(shared) = handle.upgrade() {
            PresentationController { shared }.with_state(step);
        }
    }
}

impl std::fmt::Debug for PresentationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("PresentationController")
            .field("surface", &state.surface)
            .field("queued", &state.queue.len())
            .field("progress", &state.session.progress())
            .finish()
    }
}

/// Builder for [`PresentationController`]
pub struct ControllerBuilder {
    surface: Arc<dyn PresentationSurface>,
    backing: Option<Arc<dyn KeyValueStore>>,
    timestamps: Option<DisplayTimestampStore>,
    clock: Arc<dyn Clock>,
    overrides: Arc<dyn PolicyOverrideSource>,
    callbacks: Callbacks,
    config: ControllerConfig,
    user: UserState,
}

impl ControllerBuilder {
    fn new(surface: Arc<dyn PresentationSurface>) -> Self {
        Self {
            surface,
            backing: None,
            timestamps: None,
            clock: Arc::new(SystemClock),
            overrides: Arc::new(NoOverrides),
            callbacks: Callbacks::new(),
            config: ControllerConfig::default(),
            user: UserState::default(),
        }
    }

    /// Durable store holding the timestamp mapping
    pub fn backing(mut self, backing: Arc<dyn KeyValueStore>) -> Self {
        self.backing = Some(backing);
        self
    }

    /// Use an already opened timestamp store (takes precedence over `backing`)
    pub fn timestamps(mut self, timestamps: DisplayTimestampStore) -> Self {
        self.timestamps = Some(timestamps);
        self
    }

    /// Clock used for replay delays
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Live policy override source
    pub fn overrides(mut self, overrides: Arc<dyn PolicyOverrideSource>) -> Self {
        self.overrides = overrides;
        self
    }

    /// Owner callbacks
    pub fn callbacks(mut self, callbacks: Callbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    /// Controller configuration
    pub fn config(mut self, config: ControllerConfig) -> Self {
        self.config = config;
        self
    }

    /// Initial user state
    pub fn user_state(mut self, user: UserState) -> Self {
        self.user = user;
        self
    }

    /// Build the controller
    pub fn build(self) -> PresentationController {
        let timestamps = match self.timestamps {
            Some(timestamps) => timestamps,
            None => {
                let backing = match self.backing {
                    Some(backing) => backing,
                    None => {
                        tracing::debug!(
                            "No durable backing supplied; display history is in-memory only"
                        );
                        Arc::new(MemoryStore::new()) as Arc<dyn KeyValueStore>
                    }
                };
                DisplayTimestampStore::open(backing, self.clock, self.config.timestamps_key.clone())
            }
        };
        let (events, _) = broadcast::channel(self.config.event_capacity.max(1));

        PresentationController {
            shared: Arc::new(Shared {
                state: Mutex::new(EngineState::new(self.user)),
                env: Env {
                    surface: self.surface,
                    timestamps,
                    overrides: self.overrides,
                    callbacks: self.callbacks,
                    events,
                },
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::DisplayPolicy;
    use crate::surface::TransitionDone;
    use chrono::Duration;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use storage::ManualClock;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Show(ItemId, bool),
        Hide,
    }

    /// Surface that records calls and holds transition callbacks until released
    #[derive(Default)]
    struct ManualSurface {
        calls: Mutex<Vec<Call>>,
        pending: Mutex<Vec<TransitionDone>>,
        visible: Mutex<Option<ItemId>>,
    }

    impl ManualSurface {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().clone()
        }

        fn finish_transitions(&self) {
            let pending: Vec<_> = self.pending.lock().drain(..).collect();
            for done in pending {
                done();
            }
        }
    }

    impl PresentationSurface for ManualSurface {
        fn show(&self, screen: PresentedScreen, animated: bool, done: TransitionDone) {
            self.calls
                .lock()
                .push(Call::Show(screen.item_id.clone(), animated));
            *self.visible.lock() = Some(screen.item_id);
            self.pending.lock().push(done);
        }

        fn hide(&self, done: TransitionDone) {
            self.calls.lock().push(Call::Hide);
            *self.visible.lock() = None;
            self.pending.lock().push(done);
        }

        fn is_currently_showing(&self, id: &ItemId) -> bool {
            self.visible.lock().as_ref() == Some(id)
        }
    }

    fn item(name: &str, policy: DisplayPolicy) -> Item {
        let owned = name.to_string();
        Item::new(ItemId::new(name), policy)
            .with_factory(move |_: &UserState| Some(json!({ "title": owned })))
    }

    fn setup() -> (PresentationController, Arc<ManualSurface>, Arc<AtomicUsize>) {
        let surface = Arc::new(ManualSurface::default());
        let dismissed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&dismissed);
        let controller = PresentationController::builder(surface.clone())
            .clock(Arc::new(ManualClock::default()))
            .callbacks(Callbacks::new().on_all_dismissed(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .build();
        (controller, surface, dismissed)
    }

    fn id(name: &str) -> ItemId {
        ItemId::new(name)
    }

    #[test]
    fn test_presents_head_and_queues_rest() {
        let (controller, surface, _) = setup();
        controller.set_interstitials(vec![
            item("a", DisplayPolicy::once()),
            item("b", DisplayPolicy::once()),
        ]);

        assert_eq!(surface.calls(), vec![Call::Show(id("a"), true)]);
        assert_eq!(controller.queued(), vec![id("b")]);
        assert_eq!(
            controller.state(),
            SurfaceState::Presenting {
                current: id("a"),
                transition: Transition::Animating,
            }
        );
        assert_eq!(controller.progress(), Progress { index: 0, total: 2 });
    }

    #[test]
    fn test_resupply_during_animation_does_not_stack() {
        let (controller, surface, _) = setup();
        let batch = || {
            vec![
                item("a", DisplayPolicy::once()),
                item("b", DisplayPolicy::once()),
            ]
        };

        controller.set_interstitials(batch());
        controller.set_interstitials(batch());
        surface.finish_transitions();

        assert_eq!(surface.calls(), vec![Call::Show(id("a"), true)]);
        assert_eq!(controller.current(), Some(id("a")));
        assert_eq!(controller.queued(), vec![id("b")]);
    }

    #[test]
    fn test_resupplied_screen_still_counts_as_shown() {
        let (controller, surface, _) = setup();
        let batch = || {
            vec![
                item("a", DisplayPolicy::once()),
                item("b", DisplayPolicy::once()),
            ]
        };

        controller.set_interstitials(batch());
        surface.finish_transitions();
        controller.set_interstitials(batch());
        assert_eq!(surface.calls(), vec![Call::Show(id("a"), true)]);

        let mut events = controller.subscribe();
        controller.set_interstitials(vec![item("c", DisplayPolicy::once())]);

        let collected: Vec<_> = std::iter::from_fn(|| events.try_recv().ok()).collect();
        assert_eq!(
            collected,
            vec![
                InterstitialEvent::Superseded {
                    id: id("a"),
                    never_shown: false,
                },
                InterstitialEvent::Superseded {
                    id: id("b"),
                    never_shown: true,
                },
                InterstitialEvent::Shown { id: id("c") },
            ]
        );
    }

    #[test]
    fn test_completion_during_animation_is_replayed() {
        let (controller, surface, dismissed) = setup();
        controller.set_interstitials(vec![item("a", DisplayPolicy::once())]);

        controller.did_complete(&id("a"));
        assert_eq!(surface.calls(), vec![Call::Show(id("a"), true)]);

        surface.finish_transitions();
        assert_eq!(surface.calls(), vec![Call::Show(id("a"), true), Call::Hide]);
        assert_eq!(dismissed.load(Ordering::SeqCst), 1);
        assert_eq!(controller.state(), SurfaceState::Dismissing);

        surface.finish_transitions();
        assert_eq!(controller.state(), SurfaceState::Idle);
        assert!(!controller.is_session_active());
    }

    #[test]
    fn test_batch_during_hide_starts_fresh_session() {
        let (controller, surface, dismissed) = setup();
        controller.set_interstitials(vec![item("a", DisplayPolicy::once())]);
        surface.finish_transitions();
        controller.did_complete(&id("a"));
        assert_eq!(controller.state(), SurfaceState::Dismissing);

        controller.set_interstitials(vec![item("b", DisplayPolicy::once())]);
        assert_eq!(controller.present_if_needed(), PresentOutcome::Deferred);

        surface.finish_transitions();
        assert_eq!(controller.current(), Some(id("b")));
        assert_eq!(controller.progress(), Progress { index: 0, total: 1 });
        assert_eq!(dismissed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_same_group_swaps_without_animation() {
        let (controller, surface, _) = setup();
        let terms = |name: &str| {
            Item::new(ItemId::grouped("terms", name), DisplayPolicy::once())
                .with_factory(|_: &UserState| Some(json!({})))
        };

        controller.set_interstitials(vec![terms("v1"), terms("v2")]);
        surface.finish_transitions();
        controller.did_complete(&ItemId::grouped("terms", "v1"));

        assert_eq!(
            surface.calls(),
            vec![
                Call::Show(ItemId::grouped("terms", "v1"), true),
                Call::Show(ItemId::grouped("terms", "v2"), false),
            ]
        );
    }

    #[test]
    fn test_item_without_factory_is_dropped() {
        let (controller, surface, _) = setup();
        let bare = Item::new(id("bare"), DisplayPolicy::always());
        let broken = Item::new(id("broken"), DisplayPolicy::always())
            .with_factory(|_: &UserState| -> Option<serde_json::Value> { None });

        controller.set_interstitials(vec![bare, broken, item("ok", DisplayPolicy::always())]);

        assert_eq!(surface.calls(), vec![Call::Show(id("ok"), true)]);
        assert_eq!(controller.progress().total, 1);
    }

    #[test]
    fn test_empty_batch_without_session_is_noop() {
        let (controller, surface, dismissed) = setup();
        controller.set_interstitials(Vec::new());

        assert!(surface.calls().is_empty());
        assert_eq!(controller.state(), SurfaceState::Idle);
        assert_eq!(dismissed.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_empty_batch_ends_active_session() {
        let (controller, surface, dismissed) = setup();
        controller.set_interstitials(vec![item("a", DisplayPolicy::once())]);
        surface.finish_transitions();

        controller.set_interstitials(Vec::new());
        assert_eq!(surface.calls().last(), Some(&Call::Hide));
        assert_eq!(dismissed.load(Ordering::SeqCst), 1);

        // Superseded, not completed: no timestamp recorded.
        assert!(controller.timestamps().is_empty());
    }

    #[test]
    fn test_stale_completion_does_not_advance() {
        let (controller, surface, _) = setup();
        controller.set_interstitials(vec![
            item("a", DisplayPolicy::once()),
            item("b", DisplayPolicy::once()),
        ]);
        surface.finish_transitions();
        controller.set_interstitials(vec![
            item("c", DisplayPolicy::once()),
            item("d", DisplayPolicy::once()),
        ]);
        surface.finish_transitions();

        controller.did_complete(&id("a"));
        assert_eq!(controller.current(), Some(id("c")));
        assert_eq!(controller.queued(), vec![id("d")]);
    }

    #[test]
    fn test_unknown_completion_ignored() {
        let (controller, surface, _) = setup();
        controller.set_interstitials(vec![item("a", DisplayPolicy::once())]);
        surface.finish_transitions();

        controller.did_complete(&id("zzz"));
        assert_eq!(controller.current(), Some(id("a")));
        assert!(controller.timestamps().is_empty());
    }

    #[test]
    fn test_replay_delay_suppresses_resupply() {
        let clock = ManualClock::default();
        let surface = Arc::new(ManualSurface::default());
        let controller = PresentationController::builder(surface.clone())
            .clock(Arc::new(clock.clone()))
            .build();
        let nudge = || item("nudge", DisplayPolicy::every(Duration::hours(1)));

        controller.set_interstitials(vec![nudge()]);
        surface.finish_transitions();
        controller.did_complete(&id("nudge"));
        surface.finish_transitions();

        clock.advance(Duration::minutes(30));
        controller.set_interstitials(vec![nudge()]);
        assert_eq!(controller.state(), SurfaceState::Idle);

        clock.advance(Duration::minutes(31));
        controller.set_interstitials(vec![nudge()]);
        assert_eq!(controller.current(), Some(id("nudge")));
    }

    #[test]
    fn test_reset_during_animation_hides_after_settle() {
        let (controller, surface, dismissed) = setup();
        controller.set_interstitials(vec![item("a", DisplayPolicy::once())]);

        controller.reset();
        assert!(!controller.is_session_active());
        assert_eq!(surface.calls(), vec![Call::Show(id("a"), true)]);

        surface.finish_transitions();
        assert_eq!(surface.calls().last(), Some(&Call::Hide));
        surface.finish_transitions();
        assert_eq!(controller.state(), SurfaceState::Idle);
        assert_eq!(dismissed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_events_broadcast() {
        let (controller, surface, _) = setup();
        let mut events = controller.subscribe();

        controller.set_interstitials(vec![
            item("a", DisplayPolicy::once()),
            item("b", DisplayPolicy::once()),
        ]);
        surface.finish_transitions();
        controller.set_interstitials(vec![item("c", DisplayPolicy::once())]);

        assert_eq!(
            events.recv().await.unwrap(),
            InterstitialEvent::Shown { id: id("a") }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            InterstitialEvent::Superseded {
                id: id("a"),
                never_shown: false,
            }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            InterstitialEvent::Superseded {
                id: id("b"),
                never_shown: true,
            }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            InterstitialEvent::Shown { id: id("c") }
        );
    }
}
