//! Rowpipe Consumer - FIFO queue to MySQL Lambda

use std::sync::Arc;

use anyhow::Result;
use aws_config::{BehaviorVersion, Region};
use aws_lambda_events::event::sqs::SqsEvent;
use lambda_runtime::{run, service_fn, LambdaEvent};
use rowpipe_common::{
    logging::{init_logging, LogConfig},
    queue::SqsQueue,
    HandlerResponse,
};
use rowpipe_consumer::{
    config::ConsumerConfig, credentials::CredentialCache, db::MySqlStoreFactory,
    params::SsmParameterStore, ConsumerHandler,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let log_config = LogConfig::builder()
        .filter_directives("rowpipe_consumer=debug,sqlx=warn,aws_config=warn,aws_smithy_runtime=warn")
        .build()
        .merge_env()?;

    init_logging(&log_config)?;

    let config = ConsumerConfig::load()?;
    info!(
        queue_url = %config.queue_url,
        max_connections = config.database.max_connections,
        "Configuration loaded"
    );

    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = config.region.clone() {
        loader = loader.region(Region::new(region));
    }
    let sdk_config = loader.load().await;

    // Lives for the whole process so warm invocations skip the parameter store.
    let credentials = Arc::new(CredentialCache::with_prefix(config.parameter_prefix.clone()));

    let handler = Arc::new(ConsumerHandler::new(
        Arc::new(SsmParameterStore::new(aws_sdk_ssm::Client::new(&sdk_config))),
        Arc::new(SqsQueue::new(
            aws_sdk_sqs::Client::new(&sdk_config),
            &config.queue_url,
        )),
        credentials,
        MySqlStoreFactory::new(config.database.clone()),
    ));

    run(service_fn(move |event: LambdaEvent<SqsEvent>| {
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
