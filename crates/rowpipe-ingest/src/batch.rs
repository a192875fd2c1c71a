//! Row batching and queue entry construction
//!
//! Rows are buffered and flushed as one batch-send call whenever
//! [`CHUNK_SIZE`] rows are waiting; [`RowBatcher::finish`] flushes the
//! remainder. An input of `R` rows therefore produces `ceil(R / CHUNK_SIZE)`
//! calls, and never an empty one.

use rowpipe_common::{
    envelope::{Envelope, Row},
    queue::{MessagePublisher, QueueEntry},
};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::IngestResult;

/// Rows per batch-send call; matches the queue's batch limit.
pub const CHUNK_SIZE: usize = 10;

/// Source of the millisecond timestamp mixed into deduplication ids
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Totals reported once all rows are flushed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishSummary {
    pub rows: usize,
    pub batches: usize,
}

/// Buffers rows and publishes them in chunks
pub struct RowBatcher<'a> {
    publisher: &'a dyn MessagePublisher,
    clock: &'a dyn Clock,
    env: String,
    group_id: String,
    /// Rows waiting for the next flush, tagged with their position in the file
    buffer: Vec<(usize, Row)>,
    next_position: usize,
    summary: PublishSummary,
}

impl<'a> RowBatcher<'a> {
    pub fn new(
        publisher: &'a dyn MessagePublisher,
        clock: &'a dyn Clock,
        env: impl Into<String>,
        group_id: impl Into<String>,
    ) -> Self {
        Self {
            publisher,
            clock,
            env: env.into(),
            group_id: group_id.into(),
            buffer: Vec::with_capacity(CHUNK_SIZE),
            next_position: 0,
            summary: PublishSummary::default(),
        }
    }

    /// Buffer a row, flushing if the buffer is full
    pub async fn push(&mut self, row: Row) -> IngestResult<()> {
        self.buffer.push((self.next_position, row));
        self.next_position += 1;

        if self.buffer.len() >= CHUNK_SIZE {
            self.flush().await?;
        }

        Ok(())
    }

    /// Flush the remaining partial chunk and return the totals
    pub async fn finish(mut self) -> IngestResult<PublishSummary> {
        self.flush().await?;
        Ok(self.summary)
    }

    #[instrument(skip(self), fields(env = %self.env, rows = self.buffer.len()))]
    async fn flush(&mut self) -> IngestResult<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let timestamp = self.clock.now_millis();
        let entries = self
            .buffer
            .iter()
            .map(|(position, row)| self.entry(*position, row, timestamp))
            .collect::<IngestResult<Vec<_>>>()?;
        let count = entries.len();

        self.publisher.send_batch(entries).await?;

        self.buffer.clear();
        self.summary.rows += count;
        self.summary.batches += 1;

        debug!(batch = self.summary.batches, entries = count, "Flushed batch");
        Ok(())
    }

    fn entry(&self, position: usize, row: &Row, timestamp: i64) -> IngestResult<QueueEntry> {
        let body = Envelope::new(row.clone(), self.env.clone()).to_body()?;

        Ok(QueueEntry {
            id: Uuid::new_v4().to_string(),
            body,
            group_id: self.group_id.clone(),
            deduplication_id: deduplication_id(row, position, timestamp),
        })
    }
}

/// `{row.id}-{timestamp}`, or `{position}-{timestamp}` for rows without an id
///
/// Positional ids only deduplicate within one invocation; a retried invocation
/// gets a new timestamp.
pub fn deduplication_id(row: &Row, position: usize, timestamp: i64) -> String {
    match row.get("id").filter(|id| !id.is_empty()) {
        Some(id) => format!("{}-{}", id, timestamp),
        None => format!("{}-{}", position, timestamp),
    }
}
