//! Error types shared by the rowpipe functions

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Main error type for the shared pipeline plumbing
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cannot resolve environment for bucket '{0}'")]
    UnknownEnvironment(String),

    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Queue rejected {failed} of {total} entries: {details}")]
    PartialSend {
        failed: usize,
        total: usize,
        details: String,
    },

    #[error("Batch of {0} entries exceeds the queue limit of 10")]
    BatchTooLarge(usize),
}

impl PipelineError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a queue error from any displayable source
    pub fn queue(message: impl std::fmt::Display) -> Self {
        Self::Queue(message.to_string())
    }
}
