//! Item event model as carried on the event log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single "item seen" event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemEvent {
    pub item_id: String,
    pub ingested_at: DateTime<Utc>,
}
