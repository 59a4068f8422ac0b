//! Bounded ranked set of the most frequently seen items.
//!
//! Items are ranked by `(count, item_id)`: highest count first, ties
//! broken by item id descending so retrieval order is deterministic.
//! Backends implement the unsynchronized [`TopKItems`] trait; the
//! [`SharedTopKItems`] wrapper adds the reader/writer locking needed when
//! the aggregator mutates the set while the query path reads it.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Sentinel limit that makes `get_items` return every stored item.
pub const GET_ALL_ITEMS_LIMIT: i64 = -1;

/// A single ranked entry. Replaced wholesale on update, never mutated
/// in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedItem {
    pub item_id: String,
    pub count: i64,
}

impl RankedItem {
    pub fn new(item_id: impl Into<String>, count: i64) -> Self {
        Self {
            item_id: item_id.into(),
            count,
        }
    }
}

/// Capability contract of a bounded ranked set.
///
/// Implementations are not required to be thread safe; wrap them in
/// [`SharedTopKItems`] before sharing across tasks.
pub trait TopKItems: Send + Sync {
    /// Bulk insert, used at restore time. After insertion the smallest
    /// `(count, item_id)` entries are evicted until the set fits the
    /// configured capacity. The result does not depend on input order.
    fn load(&mut self, items: Vec<RankedItem>);

    /// Items in descending `(count, item_id)` order. `GET_ALL_ITEMS_LIMIT`
    /// returns everything; otherwise at most `limit` items.
    fn get_items(&self, limit: i64) -> Vec<RankedItem>;

    /// Incremental update:
    /// 1. already present: unconditionally replace the stored value;
    /// 2. free capacity: insert;
    /// 3. count beats the current minimum: evict the minimum, insert;
    /// 4. otherwise discard.
    fn update_if_greater(&mut self, item: RankedItem);
}

/// Ordered-structure backend: a `BTreeSet` keyed by `(count, item_id)`
/// plus a point index `item_id -> count`. O(log n) insert/evict/replace,
/// O(limit) ranked retrieval. The default backend.
pub struct TopKBTreeItems {
    max_size: usize,
    tree: BTreeSet<(i64, String)>,
    counts_by_id: HashMap<String, i64>,
}

impl TopKBTreeItems {
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            tree: BTreeSet::new(),
            counts_by_id: HashMap::new(),
        }
    }

    fn insert(&mut self, item: RankedItem) {
        self.counts_by_id.insert(item.item_id.clone(), item.count);
        self.tree.insert((item.count, item.item_id));
    }

    fn evict_min(&mut self) {
        if let Some((count, item_id)) = self.tree.pop_first() {
            debug_assert_eq!(self.counts_by_id.get(&item_id), Some(&count));
            self.counts_by_id.remove(&item_id);
        }
    }
}

impl TopKItems for TopKBTreeItems {
    fn load(&mut self, items: Vec<RankedItem>) {
        for item in items {
            if let Some(existing) = self.counts_by_id.remove(&item.item_id) {
                self.tree.remove(&(existing, item.item_id.clone()));
            }
            self.insert(item);
        }
        while self.tree.len() > self.max_size {
            self.evict_min();
        }
    }

    fn get_items(&self, limit: i64) -> Vec<RankedItem> {
        let limit = if limit == GET_ALL_ITEMS_LIMIT {
            self.tree.len()
        } else {
            limit.max(0) as usize
        };
        self.tree
            .iter()
            .rev()
            .take(limit)
            .map(|(count, item_id)| RankedItem::new(item_id.clone(), *count))
            .collect()
    }

    fn update_if_greater(&mut self, item: RankedItem) {
        // Existing item: replace, even if the count did not grow. The
        // rank key changes with the count, so remove-then-insert.
        if let Some(existing) = self.counts_by_id.remove(&item.item_id) {
            self.tree.remove(&(existing, item.item_id.clone()));
            self.insert(item);
            return;
        }

        if self.tree.len() < self.max_size {
            self.insert(item);
            return;
        }

        let min_count = match self.tree.first() {
            Some((count, _)) => *count,
            None => return,
        };
        if item.count > min_count {
            self.evict_min();
            self.insert(item);
        }
    }
}

/// Linear-scan backend: a plain `Vec` with O(n) point lookup and min
/// search. Acceptable for small capacities; prefer [`TopKBTreeItems`]
/// for capacities in the hundreds and above.
pub struct TopKScanItems {
    max_size: usize,
    items: Vec<RankedItem>,
}

impl TopKScanItems {
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            items: Vec::with_capacity(max_size),
        }
    }

    fn min_index(&self) -> Option<usize> {
        self.items
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| (a.count, &a.item_id).cmp(&(b.count, &b.item_id)))
            .map(|(i, _)| i)
    }

    fn sort_descending(items: &mut [RankedItem]) {
        items.sort_by(|a, b| (b.count, &b.item_id).cmp(&(a.count, &a.item_id)));
    }
}

impl TopKItems for TopKScanItems {
    fn load(&mut self, items: Vec<RankedItem>) {
        for item in items {
            if let Some(existing) = self.items.iter_mut().find(|i| i.item_id == item.item_id) {
                *existing = item;
            } else {
                self.items.push(item);
            }
        }
        Self::sort_descending(&mut self.items);
        self.items.truncate(self.max_size);
    }

    fn get_items(&self, limit: i64) -> Vec<RankedItem> {
        let mut result = self.items.clone();
        Self::sort_descending(&mut result);
        if limit != GET_ALL_ITEMS_LIMIT {
            result.truncate(limit.max(0) as usize);
        }
        result
    }

    fn update_if_greater(&mut self, item: RankedItem) {
        if let Some(existing) = self.items.iter_mut().find(|i| i.item_id == item.item_id) {
            *existing = item;
            return;
        }

        if self.items.len() < self.max_size {
            self.items.push(item);
            return;
        }

        if let Some(min_index) = self.min_index() {
            if item.count > self.items[min_index].count {
                self.items[min_index] = item;
            }
        }
    }
}

/// Reader/writer-locked handle to a ranked set, cloneable across tasks.
///
/// The aggregator is the single writer (`load`, `update_if_greater`);
/// the query path takes concurrent read locks in `get_items`.
#[derive(Clone)]
pub struct SharedTopKItems {
    inner: Arc<RwLock<Box<dyn TopKItems>>>,
}

impl SharedTopKItems {
    pub fn new(backend: Box<dyn TopKItems>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(backend)),
        }
    }

    pub fn load(&self, items: Vec<RankedItem>) {
        self.inner.write().load(items);
    }

    pub fn get_items(&self, limit: i64) -> Vec<RankedItem> {
        self.inner.read().get_items(limit)
    }

    pub fn update_if_greater(&self, item: RankedItem) {
        self.inner.write().update_if_greater(item);
    }
}

/// Default ranked set: synchronized handle over the B-tree backend.
pub fn new_top_k_items(max_size: usize) -> SharedTopKItems {
    SharedTopKItems::new(Box::new(TopKBTreeItems::new(max_size)))
}
