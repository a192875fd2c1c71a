use async_trait::async_trait;
use aws_sdk_ssm::{error::DisplayErrorContext, Client};
use tracing::{debug, instrument};

use crate::error::{ConsumerError, ConsumerResult};

/// Named configuration values, optionally stored encrypted
#[async_trait]
pub trait ParameterStore: Send + Sync {
    async fn get_parameter(&self, name: &str, with_decryption: bool) -> ConsumerResult<String>;
}

#[derive(Clone)]
pub struct SsmParameterStore {
    client: Client,
}

impl SsmParameterStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ParameterStore for SsmParameterStore {
    #[instrument(skip(self))]
    async fn get_parameter(&self, name: &str, with_decryption: bool) -> ConsumerResult<String> {
        let output = self
            .client
            .get_parameter()
            .name(name)
            .with_decryption(with_decryption)
            .send()
            .await
            .map_err(|e| ConsumerError::ParameterStore {
                name: name.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        let value = output
            .parameter()
            .and_then(|p| p.value())
            .ok_or_else(|| ConsumerError::MissingParameter(name.to_string()))?;

        debug!("Fetched parameter");
        Ok(value.to_string())
    }
}
