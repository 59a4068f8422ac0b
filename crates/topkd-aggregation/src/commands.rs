//! Use-cases tying offsets, counters and the ranked set together.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use topkd_core::{new_top_k_items, Counters};
use topkd_checkpoint::CheckPointer;

use crate::aggregator::{Aggregator, BeginAggregatingOpts};
use crate::log::EventLogReader;
use crate::state::AggregationState;
use crate::AggregationError;

/// Aggregation use-cases: the long-running aggregator and the one-shot
/// checkpoint job.
pub struct Commands {
    reader: Arc<dyn EventLogReader>,
    aggregator: Aggregator,
    check_pointer: CheckPointer,
    top_k_size: usize,
}

impl Commands {
    pub fn new(
        reader: Arc<dyn EventLogReader>,
        aggregator: Aggregator,
        check_pointer: CheckPointer,
        top_k_size: usize,
    ) -> Self {
        Self {
            reader,
            aggregator,
            check_pointer,
            top_k_size,
        }
    }

    /// Restore durable state into `state` and aggregate continuously
    /// until cancelled. Runs for the lifetime of the service process;
    /// `state.all_time_items` is the same handle the query path reads.
    pub async fn start_aggregator(
        &mut self,
        cancel: CancellationToken,
        state: &mut AggregationState,
    ) -> Result<(), AggregationError> {
        debug!("Restoring counters state");
        let outcome = self
            .check_pointer
            .restore_state(&mut state.counters, &state.all_time_items)
            .await?;
        info!(
            total_items = state.counters.items_counters().len(),
            last_offset = state.counters.last_offset(),
            "Counters state restored"
        );

        let since_offset = outcome.next_offset();
        info!(since_offset, "Starting aggregation");
        self.aggregator
            .begin_aggregating(
                cancel,
                state,
                BeginAggregatingOpts {
                    since_offset,
                    till_offset: None,
                },
            )
            .await
    }

    /// Aggregate every event produced since the last checkpoint and dump
    /// a new one. Safe to re-run: when nothing new was produced, nothing
    /// is written; a crash between aggregate and dump just re-aggregates
    /// the same window next time.
    pub async fn create_check_point(
        &mut self,
        cancel: CancellationToken,
    ) -> Result<(), AggregationError> {
        let mut state = AggregationState::new(Counters::new(), new_top_k_items(self.top_k_size));

        info!("Starting creating check point. Restoring last state.");
        let outcome = self
            .check_pointer
            .restore_state(&mut state.counters, &state.all_time_items)
            .await?;

        let stream_tail = self
            .reader
            .read_tail_offset()
            .await
            .map_err(AggregationError::TailOffset)?;

        let since_offset = outcome.next_offset();
        if stream_tail - since_offset <= 0 {
            info!(
                since_offset,
                stream_tail, "No new messages produced. Checkpoint skipped."
            );
            return Ok(());
        }

        info!(since_offset, stream_tail, "Aggregating remaining messages");
        self.aggregator
            .begin_aggregating(
                cancel,
                &mut state,
                BeginAggregatingOpts {
                    since_offset,
                    // The tail is the offset of the NEXT message, so the
                    // last existing one sits right before it.
                    till_offset: Some(stream_tail - 1),
                },
            )
            .await?;

        info!("Producing new state");
        self.check_pointer
            .dump_state(&state.counters, &state.all_time_items)
            .await?;

        info!(
            last_offset = state.counters.last_offset(),
            "Checkpoint created"
        );
        Ok(())
    }
}
