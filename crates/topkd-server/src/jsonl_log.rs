//! File-backed event log for local development and integration tests.
//!
//! One JSON event per line; the offset of a message is its line index.
//! `fetch_next` tails the file by polling, so it keeps seeing events a
//! producer appends while the aggregator runs. Re-reading the file on
//! every poll is fine at development scale; a production deployment
//! consumes a real broker through the same trait.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use topkd_aggregation::{EventLogReader, RawMessage};
use topkd_core::ItemEvent;

pub struct JsonlEventLog {
    path: PathBuf,
    poll_interval: Duration,
    cursor: Mutex<i64>,
}

impl JsonlEventLog {
    pub fn new(path: impl Into<PathBuf>, poll_interval: Duration) -> Self {
        Self {
            path: path.into(),
            poll_interval,
            cursor: Mutex::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event, returning the offset it was assigned.
    pub fn append_event(&self, event: &ItemEvent) -> anyhow::Result<i64> {
        let offset = Self::count_lines(&std::fs::read_to_string(&self.path).unwrap_or_default());

        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(&line)?;
        Ok(offset)
    }

    fn count_lines(contents: &str) -> i64 {
        contents.lines().count() as i64
    }

    async fn read_contents(&self) -> anyhow::Result<String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(contents),
            // A log nobody has produced to yet is just empty.
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
impl EventLogReader for JsonlEventLog {
    fn set_offset(&self, offset: i64) -> anyhow::Result<()> {
        *self.cursor.lock() = offset;
        Ok(())
    }

    async fn fetch_next(&self) -> anyhow::Result<RawMessage> {
        loop {
            let offset = *self.cursor.lock();
            let contents = self.read_contents().await?;
            if let Some(line) = contents.lines().nth(offset as usize) {
                *self.cursor.lock() = offset + 1;
                return Ok(RawMessage {
                    payload: line.as_bytes().to_vec(),
                    offset,
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn read_tail_offset(&self) -> anyhow::Result<i64> {
        Ok(Self::count_lines(&self.read_contents().await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn event(item_id: &str) -> ItemEvent {
        ItemEvent {
            item_id: item_id.to_string(),
            ingested_at: Utc::now(),
        }
    }

    fn temp_log() -> (tempfile::TempDir, JsonlEventLog) {
        let dir = tempfile::tempdir().unwrap();
        let log = JsonlEventLog::new(dir.path().join("events.jsonl"), Duration::from_millis(1));
        (dir, log)
    }

    #[tokio::test]
    async fn missing_file_reads_as_empty_log() {
        let (_dir, log) = temp_log();
        assert_eq!(log.read_tail_offset().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn append_assigns_sequential_offsets() {
        let (_dir, log) = temp_log();

        assert_eq!(log.append_event(&event("a")).unwrap(), 0);
        assert_eq!(log.append_event(&event("b")).unwrap(), 1);
        assert_eq!(log.read_tail_offset().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn fetch_next_decodable_from_arbitrary_offset() {
        let (_dir, log) = temp_log();
        log.append_event(&event("a")).unwrap();
        log.append_event(&event("b")).unwrap();
        log.append_event(&event("c")).unwrap();

        log.set_offset(1).unwrap();

        let message = log.fetch_next().await.unwrap();
        assert_eq!(message.offset, 1);
        let decoded: ItemEvent = serde_json::from_slice(&message.payload).unwrap();
        assert_eq!(decoded.item_id, "b");

        let message = log.fetch_next().await.unwrap();
        assert_eq!(message.offset, 2);
    }

    #[tokio::test]
    async fn fetch_next_waits_for_appends() {
        let (_dir, log) = temp_log();
        log.append_event(&event("a")).unwrap();
        log.set_offset(0).unwrap();
        log.fetch_next().await.unwrap();

        // Nothing at offset 1 yet; the fetch must pick up the append.
        let fetch = log.fetch_next();
        log.append_event(&event("b")).unwrap();

        let message = fetch.await.unwrap();
        assert_eq!(message.offset, 1);
        let decoded: ItemEvent = serde_json::from_slice(&message.payload).unwrap();
        assert_eq!(decoded.item_id, "b");
    }
}
