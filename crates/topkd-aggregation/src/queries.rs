//! Read side: expose the live ranked set to external callers.

use serde::Serialize;
use topkd_core::{RankedItem, SharedTopKItems};

#[derive(Debug, Clone, Copy)]
pub struct GetTopKItemsParams {
    pub limit: i64,
}

#[derive(Debug, Serialize)]
pub struct GetTopKItemsResponse {
    pub data: Vec<RankedItem>,
}

/// Queries over the same ranked-set handle the aggregator writes to.
pub struct Queries {
    all_time_items: SharedTopKItems,
}

impl Queries {
    pub fn new(all_time_items: SharedTopKItems) -> Self {
        Self { all_time_items }
    }

    pub fn get_top_k_items(&self, params: GetTopKItemsParams) -> GetTopKItemsResponse {
        GetTopKItemsResponse {
            data: self.all_time_items.get_items(params.limit),
        }
    }
}
