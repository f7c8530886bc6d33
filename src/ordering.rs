//! Persistent ordering of slot panel ids.
//!
//! The store is the single source of truth for pane position: drag-reorder
//! and programmatic swap both serialize through it, and rendering never
//! mutates it implicitly. The sequence survives layout-mode changes and may
//! momentarily be a superset of the live slot set until the next `sync`.

use std::collections::HashSet;

use crate::slots::PanelId;

/// Maximum number of slots that may exist at once.
pub const MAX_SLOTS: usize = 4;

/// Ordered sequence of panel ids, independent of the underlying session list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderingStore {
    order: Vec<PanelId>,
}

impl OrderingStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current ordering.
    pub fn order(&self) -> &[PanelId] {
        &self.order
    }

    /// Number of known panel ids.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Whether a panel id is known to the store.
    pub fn contains(&self, panel_id: &str) -> bool {
        self.order.iter().any(|id| id == panel_id)
    }

    /// Whether another slot may be added without exceeding `MAX_SLOTS`.
    pub fn can_add(&self) -> bool {
        self.order.len() < MAX_SLOTS
    }

    /// Reconcile the stored order against the live slot set.
    ///
    /// Ids still live keep their relative order, newly seen ids append at the
    /// end, vanished ids are dropped. Returns `false` without touching the
    /// stored sequence when the recomputed order is element-for-element
    /// identical, so downstream derivation can skip redundant work.
    pub fn sync(&mut self, live: &[PanelId]) -> bool {
        let live_set: HashSet<&str> = live.iter().map(String::as_str).collect();
        let known: HashSet<&str> = self.order.iter().map(String::as_str).collect();

        let mut next: Vec<PanelId> = self
            .order
            .iter()
            .filter(|id| live_set.contains(id.as_str()))
            .cloned()
            .collect();

        let mut seen: HashSet<PanelId> = next.iter().cloned().collect();
        for id in live {
            if !known.contains(id.as_str()) && seen.insert(id.clone()) {
                next.push(id.clone());
            }
        }

        if next == self.order {
            return false;
        }
        self.order = next;
        true
    }

    /// Replace the ordering wholesale.
    ///
    /// The caller is expected to pass a permutation of the known ids; unknown
    /// ids and duplicates are dropped rather than rejected, and known ids
    /// missing from `new_order` are re-appended so nothing is silently lost.
    pub fn reorder(&mut self, new_order: Vec<PanelId>) {
        let known: HashSet<&str> = self.order.iter().map(String::as_str).collect();

        let mut next: Vec<PanelId> = Vec::with_capacity(self.order.len());
        for id in new_order {
            if known.contains(id.as_str()) && !next.contains(&id) {
                next.push(id);
            }
        }
        for id in &self.order {
            if !next.contains(id) {
                next.push(id.clone());
            }
        }

        self.order = next;
    }

    /// Exchange the positions of two panel ids.
    ///
    /// A persistent data swap, distinct from drag-reorder: it mutates the
    /// ordering itself and therefore survives layout-mode changes. No-op if
    /// either id is absent or the ids are equal.
    pub fn swap(&mut self, a: &str, b: &str) {
        if a == b {
            return;
        }
        let pos_a = self.order.iter().position(|id| id == a);
        let pos_b = self.order.iter().position(|id| id == b);
        match (pos_a, pos_b) {
            (Some(i), Some(j)) => self.order.swap(i, j),
            _ => {
                // Stale id from the caller; panes must never hard-fail on it.
                tracing::debug!(a, b, "swap ignored: panel id not in ordering");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[&str]) -> Vec<PanelId> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn sync_appends_new_ids_at_end() {
        let mut store = OrderingStore::new();
        assert!(store.sync(&ids(&["a", "b"])));
        assert!(store.sync(&ids(&["a", "b", "c"])));
        assert_eq!(store.order(), ids(&["a", "b", "c"]).as_slice());
    }

    #[test]
    fn sync_preserves_relative_order_of_survivors() {
        let mut store = OrderingStore::new();
        store.sync(&ids(&["a", "b", "c", "d"]));
        store.reorder(ids(&["d", "b", "a", "c"]));

        // "b" disappears, "e" appears: survivors keep their relative order.
        assert!(store.sync(&ids(&["a", "c", "d", "e"])));
        assert_eq!(store.order(), ids(&["d", "a", "c", "e"]).as_slice());
    }

    #[test]
    fn sync_is_noop_for_identical_result() {
        let mut store = OrderingStore::new();
        store.sync(&ids(&["a", "b"]));
        assert!(!store.sync(&ids(&["a", "b"])));
        // Live list order differs but the stored order already covers it.
        assert!(!store.sync(&ids(&["b", "a"])));
        assert_eq!(store.order(), ids(&["a", "b"]).as_slice());
    }

    #[test]
    fn sync_output_is_permutation_of_live() {
        let mut store = OrderingStore::new();
        store.sync(&ids(&["a", "b", "c"]));
        store.swap("a", "c");
        store.sync(&ids(&["b", "d", "a"]));

        let mut got: Vec<_> = store.order().to_vec();
        got.sort();
        assert_eq!(got, ids(&["a", "b", "d"]));
    }

    #[test]
    fn sync_never_produces_duplicates() {
        let mut store = OrderingStore::new();
        store.sync(&ids(&["a", "a", "b"]));
        assert_eq!(store.order(), ids(&["a", "b"]).as_slice());
    }

    #[test]
    fn sync_appends_each_new_id_once_alongside_survivors() {
        let mut store = OrderingStore::new();
        store.sync(&ids(&["a"]));
        assert!(store.sync(&ids(&["a", "b", "b", "c"])));
        assert_eq!(store.order(), ids(&["a", "b", "c"]).as_slice());
    }

    #[test]
    fn swap_is_an_involution() {
        let mut store = OrderingStore::new();
        store.sync(&ids(&["a", "b", "c"]));
        let original = store.order().to_vec();

        store.swap("a", "c");
        assert_eq!(store.order(), ids(&["c", "b", "a"]).as_slice());
        store.swap("a", "c");
        assert_eq!(store.order(), original.as_slice());
    }

    #[test]
    fn swap_with_unknown_or_equal_ids_is_noop() {
        let mut store = OrderingStore::new();
        store.sync(&ids(&["a", "b"]));
        store.swap("a", "missing");
        store.swap("a", "a");
        assert_eq!(store.order(), ids(&["a", "b"]).as_slice());
    }

    #[test]
    fn reorder_then_sync_with_unchanged_live_set_is_stable() {
        let mut store = OrderingStore::new();
        store.sync(&ids(&["a", "b", "c"]));
        store.reorder(ids(&["c", "a", "b"]));

        assert!(!store.sync(&ids(&["a", "b", "c"])));
        assert_eq!(store.order(), ids(&["c", "a", "b"]).as_slice());
    }

    #[test]
    fn reorder_drops_unknown_and_restores_missing() {
        let mut store = OrderingStore::new();
        store.sync(&ids(&["a", "b", "c"]));
        store.reorder(ids(&["b", "ghost", "a"]));
        assert_eq!(store.order(), ids(&["b", "a", "c"]).as_slice());
    }

    #[test]
    fn capacity_gate_follows_len() {
        let mut store = OrderingStore::new();
        store.sync(&ids(&["a", "b", "c", "d"]));
        assert!(!store.can_add());

        store.sync(&ids(&["a", "b", "c"]));
        assert!(store.can_add());
    }
}
