//! Pending presentation queue

use serde_json::Value;
use std::collections::{HashSet, VecDeque};

use crate::item::{Item, ItemId};

/// An eligible item ready to present
#[derive(Debug, Clone)]
pub struct QueuedItem {
    /// The candidate
    pub item: Item,
    /// Effective dismissability after overrides
    pub dismissable: bool,
    /// Screen body built for the current user
    pub body: Value,
}

impl QueuedItem {
    /// Identifier of the queued item
    pub fn id(&self) -> &ItemId {
        self.item.id()
    }
}

/// Ordered list of items waiting to be shown
#[derive(Debug, Default)]
pub struct ItemQueue {
    items: VecDeque<QueuedItem>,
}

impl ItemQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents with `batch`, keeping the first of any duplicate ids
    pub fn replace(&mut self, batch: Vec<QueuedItem>) {
        let mut seen = HashSet::new();
        self.items = batch
            .into_iter()
            .filter(|queued| seen.insert(queued.id().clone()))
            .collect();
    }

    /// Remove and return the next item
    pub fn pop(&mut self) -> Option<QueuedItem> {
        self.items.pop_front()
    }

    /// Drop everything
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Iterate in presentation order
    pub fn iter(&self) -> impl Iterator<Item = &QueuedItem> {
        self.items.iter()
    }

    /// Identifiers in presentation order
    pub fn ids(&self) -> Vec<ItemId> {
        self.items
            .iter()
            .map(|queued| queued.id().clone())
            .collect()
    }

    /// Number of pending items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if nothing is pending
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
