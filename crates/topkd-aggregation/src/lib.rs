// topkd-aggregation - Event consumption and top-K maintenance
//
// Consumes "item seen" events from an append-only event log, accumulates
// per-cycle increments and periodically flushes them into the cumulative
// counters and the live ranked set. Two orchestration modes: continuous
// aggregation for a long-lived service, and bounded aggregation feeding
// one-shot checkpoint creation.

mod aggregator;
mod commands;
mod log;
mod model;
mod queries;
mod state;
#[cfg(test)]
mod testing;

pub use aggregator::{Aggregator, BeginAggregatingOpts};
pub use commands::Commands;
pub use log::{EventLogReader, RawMessage};
pub use model::{AggregatorModel, FetchError, FetchedEvent};
pub use queries::{GetTopKItemsParams, GetTopKItemsResponse, Queries};
pub use state::AggregationState;

use topkd_checkpoint::CheckpointError;

/// Errors fatal to an aggregation use-case call.
///
/// Individual fetch/decode failures are NOT here: they are per-message
/// results the aggregation loop logs and skips.
#[derive(Debug, thiserror::Error)]
pub enum AggregationError {
    #[error("failed to set event log offset: {0}")]
    SetOffset(#[source] anyhow::Error),

    #[error("failed to read event log tail offset: {0}")]
    TailOffset(#[source] anyhow::Error),

    #[error("event stream closed before reaching the target offset")]
    StreamClosed,

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
}
