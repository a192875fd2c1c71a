use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::{error::DisplayErrorContext, Client};
use tracing::{debug, info, instrument};

use crate::error::{IngestError, IngestResult};

/// Read access to uploaded objects
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch the full content of an object into memory
    async fn download(&self, bucket: &str, key: &str) -> IngestResult<Vec<u8>>;
}

/// Endpoint overrides for S3-compatible stores (LocalStack, MinIO)
#[derive(Debug, Clone, Default)]
pub struct StorageConfig {
    pub endpoint: Option<String>,
    pub path_style: bool,
}

impl StorageConfig {
    pub fn from_env() -> Self {
        Self {
            endpoint: std::env::var("S3_ENDPOINT").ok(),
            path_style: std::env::var("S3_PATH_STYLE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
        }
    }
}

#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(sdk_config: &SdkConfig, config: &StorageConfig) -> Self {
        debug!("Initializing storage with config: {:?}", config);

        let mut builder =
            aws_sdk_s3::config::Builder::from(sdk_config).force_path_style(config.path_style);

        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        Self {
            client: Client::from_conf(builder.build()),
        }
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    #[instrument(skip(self))]
    async fn download(&self, bucket: &str, key: &str) -> IngestResult<Vec<u8>> {
        debug!("Downloading from s3://{}/{}", bucket, key);

        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| IngestError::storage(bucket, key, DisplayErrorContext(&e)))?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| IngestError::storage(bucket, key, e))?
            .into_bytes()
            .to_vec();

        info!(bytes = data.len(), "Downloaded s3://{}/{}", bucket, key);

        Ok(data)
    }
}
