//! Event-log reader contract.
//!
//! The concrete broker client lives outside this crate; the aggregation
//! model consumes whatever implements [`EventLogReader`]. Offsets are
//! monotonically increasing positions in an append-only log.

use async_trait::async_trait;

/// A raw message as stored on the event log.
#[derive(Debug, Clone)]
pub struct RawMessage {
    pub payload: Vec<u8>,
    pub offset: i64,
}

/// Read side of the event log.
#[async_trait]
pub trait EventLogReader: Send + Sync {
    /// Position the reader so the next [`EventLogReader::fetch_next`]
    /// returns the message at `offset`.
    fn set_offset(&self, offset: i64) -> anyhow::Result<()>;

    /// Wait for and return the next message at the current position,
    /// advancing it. Blocks until a message is available; cancellation
    /// happens by dropping the future.
    async fn fetch_next(&self) -> anyhow::Result<RawMessage>;

    /// The offset the next produced message would receive.
    async fn read_tail_offset(&self) -> anyhow::Result<i64>;
}
