//! Mock event generation for local development.

use anyhow::Result;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;
use uuid::Uuid;
use topkd_core::ItemEvent;

use crate::jsonl_log::JsonlEventLog;

/// Append `count` random events drawn from a pool of `distinct` item ids.
pub fn seed_events(log: &JsonlEventLog, count: usize, distinct: usize) -> Result<()> {
    let mut rng = StdRng::from_entropy();
    let item_ids: Vec<String> = (0..distinct.max(1))
        .map(|_| Uuid::new_v4().to_string())
        .collect();

    for _ in 0..count {
        let event = ItemEvent {
            item_id: item_ids[rng.gen_range(0..item_ids.len())].clone(),
            ingested_at: Utc::now(),
        };
        log.append_event(&event)?;
    }

    info!(count, distinct, path = %log.path().display(), "Seeded item events");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use topkd_aggregation::EventLogReader;

    #[tokio::test]
    async fn seeds_requested_number_of_events() {
        let dir = tempfile::tempdir().unwrap();
        let log = JsonlEventLog::new(dir.path().join("events.jsonl"), Duration::from_millis(1));

        seed_events(&log, 25, 3).unwrap();

        assert_eq!(log.read_tail_offset().await.unwrap(), 25);

        let message = log.fetch_next().await.unwrap();
        let decoded: ItemEvent = serde_json::from_slice(&message.payload).unwrap();
        assert!(!decoded.item_id.is_empty());
    }
}
