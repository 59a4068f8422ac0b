//! Test doubles and fixtures shared by this crate's tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use topkd_core::ItemEvent;

use crate::log::{EventLogReader, RawMessage};

pub fn item_event(item_id: &str) -> ItemEvent {
    ItemEvent {
        item_id: item_id.to_string(),
        ingested_at: Utc::now(),
    }
}

pub fn payload(item_id: &str) -> Vec<u8> {
    serde_json::to_vec(&item_event(item_id)).unwrap()
}

/// In-memory append-only event log. Offsets are indexes into the
/// message vector; `fetch_next` waits for appends past the end.
pub struct MemoryEventLog {
    messages: Mutex<Vec<Vec<u8>>>,
    cursor: Mutex<i64>,
    pub offsets_set: Mutex<Vec<i64>>,
}

impl MemoryEventLog {
    pub fn new(payloads: &[Vec<u8>]) -> Self {
        Self {
            messages: Mutex::new(payloads.to_vec()),
            cursor: Mutex::new(0),
            offsets_set: Mutex::new(Vec::new()),
        }
    }

    pub fn append(&self, payload: Vec<u8>) {
        self.messages.lock().push(payload);
    }
}

#[async_trait]
impl EventLogReader for MemoryEventLog {
    fn set_offset(&self, offset: i64) -> anyhow::Result<()> {
        self.offsets_set.lock().push(offset);
        *self.cursor.lock() = offset;
        Ok(())
    }

    async fn fetch_next(&self) -> anyhow::Result<RawMessage> {
        loop {
            {
                let offset = *self.cursor.lock();
                let messages = self.messages.lock();
                if let Some(payload) = messages.get(offset as usize) {
                    let message = RawMessage {
                        payload: payload.clone(),
                        offset,
                    };
                    *self.cursor.lock() = offset + 1;
                    return Ok(message);
                }
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    async fn read_tail_offset(&self) -> anyhow::Result<i64> {
        Ok(self.messages.lock().len() as i64)
    }
}

pub fn memory_log(payloads: &[Vec<u8>]) -> Arc<MemoryEventLog> {
    Arc::new(MemoryEventLog::new(payloads))
}
