//! Transient bundle of the state one aggregation use-case works on.

use topkd_core::{Counters, SharedTopKItems};

/// Counters plus the live ranked set, passed through restore, aggregate
/// and dump. Not itself persisted. In continuous mode `all_time_items`
/// is the same handle the query path reads.
pub struct AggregationState {
    pub counters: Counters,
    pub all_time_items: SharedTopKItems,
}

impl AggregationState {
    pub fn new(counters: Counters, all_time_items: SharedTopKItems) -> Self {
        Self {
            counters,
            all_time_items,
        }
    }
}
