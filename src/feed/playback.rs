//! Exclusive-playback coordination.
//!
//! Exactly one feed position (or none) is "active" at any time.  The
//! presentation layer asks [`PlaybackCoordinator::is_active`] for each
//! rendered row and plays or pauses its own media handle accordingly; the
//! coordinator only ever deals in indices.

use std::sync::Arc;

use tokio::sync::watch;

use super::store::StoreView;
use crate::source::FeedItem;

/// Fraction of an item's bounds that must be on screen for it to count as visible.
pub const VISIBLE_THRESHOLD: f32 = 0.5;

/// Pick the first candidate at or above `threshold` visibility.
///
/// `candidates` are `(index, visible_fraction)` pairs in the order the
/// layout reported them.  Later qualifying candidates are ignored.
pub fn first_visible(candidates: &[(usize, f32)], threshold: f32) -> Option<usize> {
    candidates
        .iter()
        .find(|(_, fraction)| *fraction >= threshold)
        .map(|(index, _)| *index)
}

/// Owner of the active index.
#[derive(Debug)]
pub struct PlaybackCoordinator {
    store: StoreView,
    active: watch::Sender<Option<usize>>,
}

impl PlaybackCoordinator {
    pub(crate) fn new(store: StoreView) -> Self {
        let (active, _) = watch::channel(None);
        Self { store, active }
    }

    /// Make `index` the active position.
    ///
    /// Ignored when `index` is past the end of the store.  Returns whether the
    /// active index changed; re-reporting the current index is a no-op.
    pub fn report_visible(&self, index: usize) -> bool {
        self.store.with(|store| {
            if index >= store.len() {
                tracing::trace!(index, len = store.len(), "ignoring visibility past end of feed");
                return false;
            }
            self.active.send_if_modified(|current| {
                if *current == Some(index) {
                    return false;
                }
                *current = Some(index);
                true
            })
        })
    }

    /// Handle one visibility event that reported several candidates: the
    /// first one wins.
    pub fn report_visible_batch(&self, indices: &[usize]) -> bool {
        indices.first().is_some_and(|&index| self.report_visible(index))
    }

    pub fn is_active(&self, index: usize) -> bool {
        *self.active.borrow() == Some(index)
    }

    pub fn active(&self) -> Option<usize> {
        *self.active.borrow()
    }

    /// The item at the active index, if any.
    pub fn active_item(&self) -> Option<Arc<FeedItem>> {
        self.store
            .with(|store| self.active().and_then(|i| store.get(i).cloned()))
    }

    /// Observe active-index changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<usize>> {
        self.active.subscribe()
    }

    /// Drop the active index.  Callers hold the store write lock while
    /// clearing the store, so no reader sees a dangling index.
    pub(crate) fn clear(&self) {
        self.active.send_if_modified(|current| current.take().is_some());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::store::FeedStore;
    use crate::feed::testing::items;
    use parking_lot::RwLock;

    fn coordinator_with(n: usize) -> (PlaybackCoordinator, Arc<RwLock<FeedStore>>) {
        let store = Arc::new(RwLock::new(FeedStore::new()));
        let ids: Vec<String> = (0..n).map(|i| i.to_string()).collect();
        let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
        store.write().append_new(items("p", &ids));
        (PlaybackCoordinator::new(StoreView::new(store.clone())), store)
    }

    #[test]
    fn starts_with_nothing_active() {
        let (c, _) = coordinator_with(3);
        assert_eq!(c.active(), None);
        assert!((0..3).all(|i| !c.is_active(i)));
    }

    #[test]
    fn at_most_one_index_is_active() {
        let (c, _) = coordinator_with(6);
        for index in [0, 3, 3, 1, 5, 9, 2] {
            c.report_visible(index);
            let active: Vec<usize> = (0..6).filter(|&i| c.is_active(i)).collect();
            assert!(active.len() <= 1, "{active:?}");
        }
        assert_eq!(c.active(), Some(2));
    }

    #[test]
    fn repeated_report_is_idempotent() {
        let (c, _) = coordinator_with(4);
        let mut rx = c.subscribe();

        assert!(c.report_visible(2));
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();

        assert!(!c.report_visible(2));
        assert_eq!(c.active(), Some(2));
        assert!(c.is_active(2));
        assert!(!rx.has_changed().unwrap(), "no second notification");
    }

    #[test]
    fn out_of_range_is_ignored() {
        let (c, _) = coordinator_with(2);
        c.report_visible(1);
        assert!(!c.report_visible(2));
        assert_eq!(c.active(), Some(1));
    }

    #[test]
    fn batch_takes_first_candidate() {
        let (c, _) = coordinator_with(5);
        assert!(c.report_visible_batch(&[3, 4]));
        assert_eq!(c.active(), Some(3));
        assert!(!c.report_visible_batch(&[]));
    }

    #[test]
    fn active_item_follows_index() {
        let (c, _) = coordinator_with(3);
        c.report_visible(1);
        assert_eq!(c.active_item().unwrap().id, "p:1");
        c.clear();
        assert!(c.active_item().is_none());
    }

    #[test]
    fn first_visible_applies_threshold() {
        let seen = [(4, 0.2), (5, 0.7), (6, 0.9)];
        assert_eq!(first_visible(&seen, VISIBLE_THRESHOLD), Some(5));
        assert_eq!(first_visible(&[(1, 0.49)], VISIBLE_THRESHOLD), None);
        assert_eq!(first_visible(&[(1, 0.5)], VISIBLE_THRESHOLD), Some(1));
    }
}
