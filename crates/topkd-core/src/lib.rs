// topkd-core - Platform-agnostic aggregation state
//
// This crate contains the PURE data structures of the top-K system:
// the bounded ranked set, the cumulative counters and the item event
// model. No I/O, no async, no runtime dependencies.

mod counters;
mod event;
mod top_k;

pub use counters::Counters;
pub use event::ItemEvent;
pub use top_k::{
    new_top_k_items, RankedItem, SharedTopKItems, TopKBTreeItems, TopKItems, TopKScanItems,
    GET_ALL_ITEMS_LIMIT,
};
