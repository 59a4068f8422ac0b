//! The aggregation loop.

use std::time::Duration;

use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::model::AggregatorModel;
use crate::state::AggregationState;
use crate::AggregationError;

/// Offset window for one aggregation run.
#[derive(Debug, Clone, Copy, Default)]
pub struct BeginAggregatingOpts {
    /// First offset to consume. Zero is a real offset: cold starts pass
    /// it explicitly.
    pub since_offset: i64,
    /// Inclusive stop offset for bounded runs; `None` runs until
    /// cancelled (continuous mode).
    pub till_offset: Option<i64>,
}

/// Drives the consume/flush select loop over the aggregator model.
///
/// Single consumer: all aggregation and flushing happens on the calling
/// task, in the order the background fetch task emits results.
pub struct Aggregator {
    model: AggregatorModel,
    flush_interval: Duration,
    verbose: bool,
}

impl Aggregator {
    pub fn new(model: AggregatorModel, flush_interval: Duration, verbose: bool) -> Self {
        Self {
            model,
            flush_interval,
            verbose,
        }
    }

    /// Consume events from `opts.since_offset`, flushing on every timer
    /// tick and once more on the bounded-run exit.
    ///
    /// Cancellation returns immediately WITHOUT a final flush: increments
    /// since the last flush are recomputed from the event log on the next
    /// run, since the log is the durable source of truth.
    pub async fn begin_aggregating(
        &mut self,
        cancel: CancellationToken,
        state: &mut AggregationState,
        opts: BeginAggregatingOpts,
    ) -> Result<(), AggregationError> {
        let mut messages = self.model.fetch_messages(cancel.clone(), opts.since_offset)?;
        let mut flush_timer = interval_at(
            Instant::now() + self.flush_interval,
            self.flush_interval,
        );

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => return Ok(()),

                _ = flush_timer.tick() => self.model.flush_messages(state),

                result = messages.recv() => match result {
                    None => {
                        // The fetch task only stops on cancellation or
                        // receiver drop; anything else cut a bounded run
                        // short.
                        if cancel.is_cancelled() {
                            return Ok(());
                        }
                        return Err(AggregationError::StreamClosed);
                    }
                    Some(Err(err)) => {
                        error!(error = %err, "failed to fetch message");
                    }
                    Some(Ok(fetched)) => {
                        self.model.aggregate_item_event(fetched.offset, &fetched.event);
                        if self.verbose {
                            debug!(
                                item_id = %fetched.event.item_id,
                                offset = fetched.offset,
                                "Item event aggregated"
                            );
                        }
                        if let Some(till_offset) = opts.till_offset {
                            if fetched.offset >= till_offset {
                                info!(
                                    offset = fetched.offset,
                                    till_offset,
                                    "Target offset reached. Flushing and stopping aggregation."
                                );
                                self.model.flush_messages(state);
                                return Ok(());
                            }
                        }
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{memory_log, payload};
    use topkd_core::{new_top_k_items, Counters, RankedItem, GET_ALL_ITEMS_LIMIT};

    fn state() -> AggregationState {
        AggregationState::new(Counters::new(), new_top_k_items(10))
    }

    fn aggregator(model: AggregatorModel) -> Aggregator {
        Aggregator::new(model, Duration::from_secs(5), false)
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_run_aggregates_window_and_flushes() {
        let log = memory_log(&[payload("a"), payload("b"), payload("a"), payload("c")]);
        let mut agg = aggregator(AggregatorModel::new(log.clone()));
        let mut state = state();

        agg.begin_aggregating(
            CancellationToken::new(),
            &mut state,
            BeginAggregatingOpts {
                since_offset: 0,
                till_offset: Some(2),
            },
        )
        .await
        .unwrap();

        assert_eq!(state.counters.last_offset(), 2);
        assert_eq!(state.counters.items_counters()["a"], 2);
        assert_eq!(state.counters.items_counters()["b"], 1);
        assert!(!state.counters.items_counters().contains_key("c"));
        assert_eq!(
            state.all_time_items.get_items(GET_ALL_ITEMS_LIMIT),
            vec![RankedItem::new("a", 2), RankedItem::new("b", 1)]
        );
        assert_eq!(*log.offsets_set.lock(), vec![0]);
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_run_resumes_from_since_offset() {
        let log = memory_log(&[payload("a"), payload("b"), payload("c")]);
        let mut agg = aggregator(AggregatorModel::new(log.clone()));
        let mut state = state();

        agg.begin_aggregating(
            CancellationToken::new(),
            &mut state,
            BeginAggregatingOpts {
                since_offset: 2,
                till_offset: Some(2),
            },
        )
        .await
        .unwrap();

        assert_eq!(state.counters.items_counters().len(), 1);
        assert_eq!(state.counters.items_counters()["c"], 1);
        assert_eq!(*log.offsets_set.lock(), vec![2]);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_events_are_skipped() {
        let log = memory_log(&[payload("a"), b"garbage".to_vec(), payload("b")]);
        let mut agg = aggregator(AggregatorModel::new(log));
        let mut state = state();

        agg.begin_aggregating(
            CancellationToken::new(),
            &mut state,
            BeginAggregatingOpts {
                since_offset: 0,
                till_offset: Some(2),
            },
        )
        .await
        .unwrap();

        assert_eq!(state.counters.items_counters()["a"], 1);
        assert_eq!(state.counters.items_counters()["b"], 1);
        assert_eq!(state.counters.last_offset(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn flush_timer_publishes_between_events() {
        let log = memory_log(&[payload("a")]);
        let mut agg = Aggregator::new(
            AggregatorModel::new(log.clone()),
            Duration::from_millis(100),
            false,
        );

        let cancel = CancellationToken::new();
        let mut state = state();

        let stopper = cancel.clone();
        let handle = tokio::spawn(async move {
            // Well past several flush intervals; paused time auto-advances.
            tokio::time::sleep(Duration::from_secs(2)).await;
            stopper.cancel();
        });

        agg.begin_aggregating(
            cancel,
            &mut state,
            BeginAggregatingOpts {
                since_offset: 0,
                till_offset: None,
            },
        )
        .await
        .unwrap();
        handle.await.unwrap();

        // The single event was flushed by the timer, not by cancellation.
        assert_eq!(state.counters.items_counters()["a"], 1);
        assert_eq!(
            state.all_time_items.get_items(GET_ALL_ITEMS_LIMIT),
            vec![RankedItem::new("a", 1)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_discards_unflushed_increments() {
        let log = memory_log(&[payload("a")]);
        // Flush interval far beyond the test horizon: nothing flushes.
        let mut agg = Aggregator::new(
            AggregatorModel::new(log.clone()),
            Duration::from_secs(3600),
            false,
        );

        let cancel = CancellationToken::new();
        let mut state = state();

        let stopper = cancel.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            stopper.cancel();
        });

        agg.begin_aggregating(
            cancel,
            &mut state,
            BeginAggregatingOpts {
                since_offset: 0,
                till_offset: None,
            },
        )
        .await
        .unwrap();
        handle.await.unwrap();

        assert!(state.counters.items_counters().is_empty());
        assert_eq!(state.counters.last_offset(), 0);
        assert!(state.all_time_items.get_items(GET_ALL_ITEMS_LIMIT).is_empty());
    }
}
