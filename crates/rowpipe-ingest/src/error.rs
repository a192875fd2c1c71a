//! Ingestion error types

use rowpipe_common::PipelineError;
use thiserror::Error;

pub type IngestResult<T> = Result<T, IngestError>;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Failed to fetch s3://{bucket}/{key}: {message}")]
    Storage {
        bucket: String,
        key: String,
        message: String,
    },

    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid upload event: {0}")]
    InvalidEvent(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl IngestError {
    pub fn storage(bucket: &str, key: &str, message: impl std::fmt::Display) -> Self {
        Self::Storage {
            bucket: bucket.to_string(),
            key: key.to_string(),
            message: message.to_string(),
        }
    }
}
