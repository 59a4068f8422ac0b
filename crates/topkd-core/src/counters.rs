//! Cumulative per-item counters with offset bookkeeping.

use std::collections::HashMap;

/// All-time per-item totals plus the last event-log offset whose effect
/// is reflected in them.
///
/// Single writer by construction: only the aggregator's flush path calls
/// [`Counters::update_items_count`], from one task.
#[derive(Debug, Default)]
pub struct Counters {
    last_offset: i64,
    item_counters: HashMap<String, i64>,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `increments` additively into the totals and record
    /// `last_offset`. Callers always pass an offset >= the previous one.
    pub fn update_items_count(&mut self, last_offset: i64, increments: &HashMap<String, i64>) {
        self.last_offset = last_offset;
        for (item_id, increment) in increments {
            *self.item_counters.entry(item_id.clone()).or_default() += increment;
        }
    }

    pub fn items_counters(&self) -> &HashMap<String, i64> {
        &self.item_counters
    }

    pub fn last_offset(&self) -> i64 {
        self.last_offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_items_count_accumulates() {
        let mut counters = Counters::new();

        counters.update_items_count(10, &HashMap::from([("x".to_string(), 3), ("y".to_string(), 2)]));
        counters.update_items_count(15, &HashMap::from([("x".to_string(), 1)]));

        assert_eq!(counters.last_offset(), 15);
        assert_eq!(
            counters.items_counters(),
            &HashMap::from([("x".to_string(), 4), ("y".to_string(), 2)])
        );
    }

    #[test]
    fn update_items_count_with_empty_increments_still_advances_offset() {
        let mut counters = Counters::new();
        counters.update_items_count(7, &HashMap::new());

        assert_eq!(counters.last_offset(), 7);
        assert!(counters.items_counters().is_empty());
    }

    #[test]
    fn fresh_counters_are_empty_at_offset_zero() {
        let counters = Counters::new();
        assert_eq!(counters.last_offset(), 0);
        assert!(counters.items_counters().is_empty());
    }
}
