//! Per-session completion tracking
//!
//! A session spans from the first presentation to the moment the surface has
//! fully dismissed. Entries record whether each item has been completed (or
//! superseded) and whether it actually reached the screen, so progress stays
//! monotonic while analytics can still tell the two apart.

use std::collections::HashMap;

use crate::item::ItemId;
use crate::surface::Progress;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Entry {
    completed: bool,
    shown: bool,
}

/// Item superseded by a newer batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Superseded {
    /// The superseded item
    pub id: ItemId,
    /// True when the item was queued but never displayed
    pub never_shown: bool,
}

/// Completion map for the current session
#[derive(Debug, Default)]
pub struct SessionTracker {
    entries: HashMap<ItemId, Entry>,
    dismissal_notified: bool,
}

impl SessionTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark every open entry complete because a new batch replaced it
    pub fn supersede_all(&mut self) -> Vec<Superseded> {
        let mut superseded: Vec<Superseded> = self
            .entries
            .iter_mut()
            .filter(|(_, entry)| !entry.completed)
            .map(|(id, entry)| {
                entry.completed = true;
                Superseded {
                    id: id.clone(),
                    never_shown: !entry.shown,
                }
            })
            .collect();
        superseded.sort_by(|a, b| a.id.cmp(&b.id));
        superseded
    }

    /// Track `id` as a fresh, incomplete entry
    pub fn add_pending(&mut self, id: ItemId) {
        self.entries.insert(id, Entry::default());
    }

    /// Record that `id` reached the screen
    pub fn mark_shown(&mut self, id: &ItemId) {
        if let Some(entry) = self.entries.get_mut(id) {
            entry.shown = true;
        }
    }

    /// Mark `id` complete, returning whether it belongs to this session
    pub fn mark_complete(&mut self, id: &ItemId) -> bool {
        match self.entries.get_mut(id) {
            Some(entry) => {
                entry.completed = true;
                true
            }
            None => false,
        }
    }

    /// Completed entries out of all entries
    pub fn progress(&self) -> Progress {
        let index = self.entries.values().filter(|entry| entry.completed).count();
        Progress {
            index,
            total: self.entries.len(),
        }
    }

    /// Whether a session is in progress
    pub fn is_active(&self) -> bool {
        !self.entries.is_empty()
    }

    /// Claim the "all dismissed" notification
    ///
    /// Returns true at most once per session, and only while it is active.
    pub fn claim_dismissal(&mut self) -> bool {
        if !self.is_active() || self.dismissal_notified {
            return false;
        }
        self.dismissal_notified = true;
        true
    }

    /// End the session
    pub fn clear(&mut self) {
        self.entries.clear();
        self.dismissal_notified = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> ItemId {
        ItemId::new(name)
    }

    #[test]
    fn test_progress_counts_completed() {
        let mut session = SessionTracker::new();
        session.add_pending(id("a"));
        session.add_pending(id("b"));
        session.add_pending(id("c"));

        assert_eq!(session.progress(), Progress { index: 0, total: 3 });
        assert!(session.mark_complete(&id("a")));
        assert_eq!(session.progress(), Progress { index: 1, total: 3 });
        assert!(!session.mark_complete(&id("zzz")));
        assert_eq!(session.progress(), Progress { index: 1, total: 3 });
    }

    #[test]
    fn test_supersede_reports_never_shown() {
        let mut session = SessionTracker::new();
        session.add_pending(id("a"));
        session.add_pending(id("b"));
        session.add_pending(id("c"));
        session.mark_shown(&id("a"));
        session.mark_shown(&id("b"));
        session.mark_complete(&id("a"));

        let superseded = session.supersede_all();
        assert_eq!(
            superseded,
            vec![
                Superseded {
                    id: id("b"),
                    never_shown: false,
                },
                Superseded {
                    id: id("c"),
                    never_shown: true,
                },
            ]
        );
        assert_eq!(session.progress(), Progress { index: 3, total: 3 });
    }

    #[test]
    fn test_resupplied_item_becomes_pending_again() {
        let mut session = SessionTracker::new();
        session.add_pending(id("a"));
        session.mark_complete(&id("a"));
        session.supersede_all();

        session.add_pending(id("a"));
        assert_eq!(session.progress(), Progress { index: 0, total: 1 });
        assert!(session.mark_complete(&id("a")));
    }

    #[test]
    fn test_dismissal_claimed_once_per_session() {
        let mut session = SessionTracker::new();
        assert!(!session.claim_dismissal());

        session.add_pending(id("a"));
        assert!(session.claim_dismissal());
        assert!(!session.claim_dismissal());

        session.clear();
        assert!(!session.is_active());
        session.add_pending(id("b"));
        assert!(session.claim_dismissal());
    }
}
