//! Aggregation model: raw message fetching, scratch accumulation and
//! flushing into the durable counters and the ranked set.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use topkd_core::{ItemEvent, RankedItem};

use crate::log::EventLogReader;
use crate::state::AggregationState;
use crate::AggregationError;

/// A decoded event together with its log offset.
#[derive(Debug, Clone)]
pub struct FetchedEvent {
    pub event: ItemEvent,
    pub offset: i64,
}

/// Per-message failure emitted on the fetch stream. The aggregation loop
/// logs these and keeps consuming.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("failed to fetch message: {0}")]
    Fetch(#[source] anyhow::Error),

    #[error("failed to decode message at offset {offset}: {source}")]
    Decode {
        offset: i64,
        source: serde_json::Error,
    },
}

/// Wraps the event-log reader and owns the in-memory scratch state
/// accumulated between flushes.
///
/// `aggregate_item_event` and `flush_messages` are intentionally `&mut`
/// and must run on the aggregator's task; only the fetch side runs in
/// the background.
pub struct AggregatorModel {
    reader: Arc<dyn EventLogReader>,
    last_aggregated_offset: i64,
    aggregated_items: HashMap<String, i64>,
}

impl AggregatorModel {
    pub fn new(reader: Arc<dyn EventLogReader>) -> Self {
        Self {
            reader,
            last_aggregated_offset: 0,
            aggregated_items: HashMap::new(),
        }
    }

    /// Position the reader at `from_offset` and start the background
    /// fetch task. Results arrive over a single-slot channel, so the
    /// task never runs ahead of the consumer by more than one message.
    ///
    /// Fetch and decode failures are emitted as `Err` results; the
    /// stream itself only ends on cancellation or when the receiver is
    /// dropped.
    pub fn fetch_messages(
        &self,
        cancel: CancellationToken,
        from_offset: i64,
    ) -> Result<mpsc::Receiver<Result<FetchedEvent, FetchError>>, AggregationError> {
        self.reader
            .set_offset(from_offset)
            .map_err(AggregationError::SetOffset)?;

        let (tx, rx) = mpsc::channel(1);
        let reader = self.reader.clone();
        tokio::spawn(async move {
            loop {
                let fetched = tokio::select! {
                    _ = cancel.cancelled() => break,
                    res = reader.fetch_next() => res,
                };

                let result = match fetched {
                    Ok(message) => match serde_json::from_slice::<ItemEvent>(&message.payload) {
                        Ok(event) => Ok(FetchedEvent {
                            event,
                            offset: message.offset,
                        }),
                        Err(source) => Err(FetchError::Decode {
                            offset: message.offset,
                            source,
                        }),
                    },
                    Err(err) => Err(FetchError::Fetch(err)),
                };

                if tx.send(result).await.is_err() {
                    break;
                }
            }
        });

        Ok(rx)
    }

    /// Record one event in the scratch map. Must be called from the same
    /// task as [`AggregatorModel::flush_messages`].
    pub fn aggregate_item_event(&mut self, offset: i64, event: &ItemEvent) {
        self.last_aggregated_offset = offset;
        *self
            .aggregated_items
            .entry(event.item_id.clone())
            .or_default() += 1;
    }

    /// Merge the scratch increments into the counters, push the new
    /// cumulative totals of every touched item into the ranked set, and
    /// clear the scratch map.
    ///
    /// Skipped entirely when nothing was aggregated since the last
    /// flush, so an idle timer tick cannot rewind `counters.last_offset`
    /// to the scratch default.
    pub fn flush_messages(&mut self, state: &mut AggregationState) {
        if self.aggregated_items.is_empty() {
            return;
        }
        debug!(
            last_offset = self.last_aggregated_offset,
            items = self.aggregated_items.len(),
            "Flushing aggregated messages"
        );

        state
            .counters
            .update_items_count(self.last_aggregated_offset, &self.aggregated_items);

        for item_id in self.aggregated_items.keys() {
            let total = state.counters.items_counters()[item_id];
            state
                .all_time_items
                .update_if_greater(RankedItem::new(item_id.clone(), total));
        }

        self.aggregated_items.clear();
    }
}
