//! Configuration management

use rowpipe_common::environment::EnvResolver;
use serde::{Deserialize, Serialize};

use crate::error::{IngestError, IngestResult};

/// FIFO group shared by every message of an ingestion run.
pub const DEFAULT_MESSAGE_GROUP_ID: &str = "CSVChunkGroup";

/// Default field delimiter of uploaded files.
pub const DEFAULT_CSV_DELIMITER: u8 = b',';

/// Ingestion function configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Target FIFO queue
    pub queue_url: String,
    /// AWS region override; the SDK default chain is used when unset
    pub region: Option<String>,
    pub message_group_id: String,
    /// Raw `bucket=env` list, see [`EnvResolver::parse_mappings`]
    pub bucket_env_map: Option<String>,
    pub csv_delimiter: u8,
}

impl IngestConfig {
    /// Load configuration from environment and defaults
    ///
    /// Environment variables:
    /// - `QUEUE_URL` (required)
    /// - `AWS_REGION`
    /// - `MESSAGE_GROUP_ID`
    /// - `BUCKET_ENV_MAP`
    /// - `CSV_DELIMITER` (single ASCII character)
    pub fn load() -> IngestResult<Self> {
        dotenvy::dotenv().ok();

        let queue_url = std::env::var("QUEUE_URL")
            .map_err(|_| IngestError::Config("QUEUE_URL not set".to_string()))?;

        let csv_delimiter = match std::env::var("CSV_DELIMITER") {
            Ok(value) => parse_delimiter(&value)?,
            Err(_) => DEFAULT_CSV_DELIMITER,
        };

        let config = Self {
            queue_url,
            region: std::env::var("AWS_REGION").ok(),
            message_group_id: std::env::var("MESSAGE_GROUP_ID")
                .unwrap_or_else(|_| DEFAULT_MESSAGE_GROUP_ID.to_string()),
            bucket_env_map: std::env::var("BUCKET_ENV_MAP").ok(),
            csv_delimiter,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> IngestResult<()> {
        if self.queue_url.trim().is_empty() {
            return Err(IngestError::Config("QUEUE_URL cannot be empty".to_string()));
        }

        if self.message_group_id.trim().is_empty() {
            return Err(IngestError::Config(
                "MESSAGE_GROUP_ID cannot be empty".to_string(),
            ));
        }

        if !self.queue_url.ends_with(".fifo") {
            tracing::warn!(
                queue_url = %self.queue_url,
                "Queue URL does not look like a FIFO queue; group and deduplication ids will be rejected"
            );
        }

        self.env_resolver()?;

        Ok(())
    }

    pub fn env_resolver(&self) -> IngestResult<EnvResolver> {
        match self.bucket_env_map {
            Some(ref mappings) => Ok(EnvResolver::parse_mappings(mappings)?),
            None => Ok(EnvResolver::new()),
        }
    }
}

fn parse_delimiter(value: &str) -> IngestResult<u8> {
    match value.as_bytes() {
        [byte] if byte.is_ascii() => Ok(*byte),
        _ if value == "\\t" => Ok(b'\t'),
        _ => Err(IngestError::Config(format!(
            "CSV_DELIMITER must be a single ASCII character, got '{}'",
            value
        ))),
    }
}
