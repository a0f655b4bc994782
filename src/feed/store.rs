//! Append-only, de-duplicated sequence of loaded feed items.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::source::FeedItem;

/// Ordered items plus a mirrored id set for O(1) membership tests.
#[derive(Debug, Default)]
pub struct FeedStore {
    items: Vec<Arc<FeedItem>>,
    ids: HashSet<String>,
}

impl FeedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<FeedItem>> {
        self.items.get(index)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<FeedItem>> {
        self.items.iter()
    }

    /// Append `item` unless its id is already present.  First seen wins.
    pub fn append(&mut self, item: FeedItem) -> bool {
        if self.ids.contains(&item.id) {
            return false;
        }
        self.ids.insert(item.id.clone());
        self.items.push(Arc::new(item));
        true
    }

    /// Append every genuinely new item in order; returns how many were added.
    pub fn append_new(&mut self, items: impl IntoIterator<Item = FeedItem>) -> usize {
        let mut added = 0;
        for item in items {
            if self.append(item) {
                added += 1;
            }
        }
        added
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.ids.clear();
    }
}

/// Read-only handle on the store owned by the aggregator.
#[derive(Debug, Clone)]
pub struct StoreView {
    inner: Arc<RwLock<FeedStore>>,
}

impl StoreView {
    pub(crate) fn new(inner: Arc<RwLock<FeedStore>>) -> Self {
        Self { inner }
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Arc<FeedItem>> {
        self.inner.read().get(index).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.read().contains(id)
    }

    /// Cheap copy of the current sequence for rendering.
    pub fn snapshot(&self) -> Vec<Arc<FeedItem>> {
        self.inner.read().iter().cloned().collect()
    }

    /// Run `f` against the store under one read lock.
    pub(crate) fn with<R>(&self, f: impl FnOnce(&FeedStore) -> R) -> R {
        f(&self.inner.read())
    }
}
