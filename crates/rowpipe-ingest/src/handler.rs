//! Upload notification handler

use std::sync::Arc;

use aws_lambda_events::event::s3::S3Event;
use rowpipe_common::{environment::EnvResolver, queue::MessagePublisher, HandlerResponse};
use tracing::{error, info, instrument};

use crate::{
    batch::{Clock, RowBatcher, SystemClock},
    config::IngestConfig,
    error::IngestResult,
    event::{upload_targets, UploadTarget},
    parse::parse_rows,
    storage::ObjectStore,
};

/// Outcome of ingesting one uploaded object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestSummary {
    pub bucket: String,
    pub key: String,
    pub env: String,
    pub rows: usize,
    pub batches: usize,
}

pub struct IngestHandler {
    store: Arc<dyn ObjectStore>,
    publisher: Arc<dyn MessagePublisher>,
    clock: Arc<dyn Clock>,
    resolver: EnvResolver,
    group_id: String,
    delimiter: u8,
}

impl IngestHandler {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        publisher: Arc<dyn MessagePublisher>,
        config: &IngestConfig,
    ) -> IngestResult<Self> {
        Ok(Self {
            store,
            publisher,
            clock: Arc::new(SystemClock),
            resolver: config.env_resolver()?,
            group_id: config.message_group_id.clone(),
            delimiter: config.csv_delimiter,
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Run one invocation and map the outcome onto the response contract
    pub async fn handle(&self, event: &S3Event) -> HandlerResponse {
        match self.ingest(event).await {
            Ok(summaries) => {
                info!(objects = summaries.len(), "Ingestion succeeded");
                HandlerResponse::success("success")
            },
            Err(e) => {
                error!(error = %e, "Ingestion failed");
                HandlerResponse::error(e.to_string())
            },
        }
    }

    /// Ingest every object named by the notification, stopping at the first failure
    pub async fn ingest(&self, event: &S3Event) -> IngestResult<Vec<IngestSummary>> {
        let targets = upload_targets(event)?;
        let mut summaries = Vec::with_capacity(targets.len());

        for target in &targets {
            summaries.push(self.ingest_object(target).await?);
        }

        Ok(summaries)
    }

    #[instrument(skip(self), fields(bucket = %target.bucket, key = %target.key))]
    pub async fn ingest_object(&self, target: &UploadTarget) -> IngestResult<IngestSummary> {
        let env = self.resolver.resolve(&target.bucket)?;
        let data = self.store.download(&target.bucket, &target.key).await?;

        let mut batcher = RowBatcher::new(
            self.publisher.as_ref(),
            self.clock.as_ref(),
            env.clone(),
            self.group_id.clone(),
        );

        for row in parse_rows(&data, self.delimiter)? {
            batcher.push(row?).await?;
        }

        let published = batcher.finish().await?;

        info!(
            env = %env,
            rows = published.rows,
            batches = published.batches,
            "Published upload to queue"
        );

        Ok(IngestSummary {
            bucket: target.bucket.clone(),
            key: target.key.clone(),
            env,
            rows: published.rows,
            batches: published.batches,
        })
    }
}
