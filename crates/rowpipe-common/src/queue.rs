//! FIFO queue seams and their SQS implementation
//!
//! The ingestion function only publishes and the consumer only deletes, so the
//! two capabilities are separate traits. [`SqsQueue`] implements both.

use async_trait::async_trait;
use aws_sdk_sqs::{error::DisplayErrorContext, types::SendMessageBatchRequestEntry, Client};
use tracing::{debug, instrument, warn};

use crate::{PipelineError, Result};

/// Maximum entries accepted by a single batch-send call
pub const MAX_BATCH_ENTRIES: usize = 10;

/// One message of a batch-send call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    /// Unique within the batch
    pub id: String,
    pub body: String,
    pub group_id: String,
    pub deduplication_id: String,
}

#[async_trait]
pub trait MessagePublisher: Send + Sync {
    /// Send up to [`MAX_BATCH_ENTRIES`] messages in one call
    ///
    /// Fails if the call fails or if any entry is rejected.
    async fn send_batch(&self, entries: Vec<QueueEntry>) -> Result<()>;
}

#[async_trait]
pub trait MessageDeleter: Send + Sync {
    /// Remove a consumed message using its receipt handle
    async fn delete(&self, receipt_handle: &str) -> Result<()>;
}

#[derive(Clone)]
pub struct SqsQueue {
    client: Client,
    queue_url: String,
}

impl SqsQueue {
    pub fn new(client: Client, queue_url: impl Into<String>) -> Self {
        Self {
            client,
            queue_url: queue_url.into(),
        }
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }
}

#[async_trait]
impl MessagePublisher for SqsQueue {
    #[instrument(skip(self, entries), fields(entries = entries.len()))]
    async fn send_batch(&self, entries: Vec<QueueEntry>) -> Result<()> {
        if entries.len() > MAX_BATCH_ENTRIES {
            return Err(PipelineError::BatchTooLarge(entries.len()));
        }
        if entries.is_empty() {
            return Ok(());
        }

        let total = entries.len();
        let request_entries = entries
            .into_iter()
            .map(|entry| {
                SendMessageBatchRequestEntry::builder()
                    .id(entry.id)
                    .message_body(entry.body)
                    .message_group_id(entry.group_id)
                    .message_deduplication_id(entry.deduplication_id)
                    .build()
                    .map_err(PipelineError::queue)
            })
            .collect::<Result<Vec<_>>>()?;

        let response = self
            .client
            .send_message_batch()
            .queue_url(&self.queue_url)
            .set_entries(Some(request_entries))
            .send()
            .await
            .map_err(|e| PipelineError::queue(DisplayErrorContext(&e)))?;

        let failed = response.failed();
        if !failed.is_empty() {
            let details = failed
                .iter()
                .map(|f| format!("{}: {} ({})", f.id(), f.code(), f.message().unwrap_or("unknown")))
                .collect::<Vec<_>>()
                .join("; ");
            warn!(failed = failed.len(), total, %details, "Queue rejected batch entries");

            return Err(PipelineError::PartialSend {
                failed: failed.len(),
                total,
                details,
            });
        }

        debug!(sent = response.successful().len(), "Sent batch to queue");
        Ok(())
    }
}

#[async_trait]
impl MessageDeleter for SqsQueue {
    #[instrument(skip(self, receipt_handle))]
    async fn delete(&self, receipt_handle: &str) -> Result<()> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| PipelineError::queue(DisplayErrorContext(&e)))?;

        debug!("Deleted message from queue");
        Ok(())
    }
}
