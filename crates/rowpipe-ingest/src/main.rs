//! Rowpipe Ingest - S3 upload to FIFO queue Lambda

use std::sync::Arc;

use anyhow::Result;
use aws_config::{BehaviorVersion, Region};
use aws_lambda_events::event::s3::S3Event;
use lambda_runtime::{run, service_fn, LambdaEvent};
use rowpipe_common::{
    logging::{init_logging, LogConfig},
    queue::SqsQueue,
    HandlerResponse,
};
use rowpipe_ingest::{
    config::IngestConfig,
    storage::{S3ObjectStore, StorageConfig},
    IngestHandler,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let log_config = LogConfig::builder()
        .filter_directives("rowpipe_ingest=debug,aws_config=warn,aws_smithy_runtime=warn")
        .build()
        .merge_env()?;

    init_logging(&log_config)?;

    let config = IngestConfig::load()?;
    info!(queue_url = %config.queue_url, "Configuration loaded");

    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = config.region.clone() {
        loader = loader.region(Region::new(region));
    }
    let sdk_config = loader.load().await;

    let store = S3ObjectStore::new(&sdk_config, &StorageConfig::from_env());
    let queue = SqsQueue::new(aws_sdk_sqs::Client::new(&sdk_config), &config.queue_url);

    let handler = Arc::new(IngestHandler::new(
        Arc::new(store),
        Arc::new(queue),
        &config,
    )?);

    run(service_fn(move |event: LambdaEvent<S3Event>| {
        let handler = handler.clone();
        async move {
            let response = handler.handle(&event.payload).await;
            Ok::<HandlerResponse, lambda_runtime::Error>(response)
        }
    }))
    .await
    .map_err(|e| anyhow::anyhow!("Lambda runtime error: {}", e))?;

    Ok(())
}
