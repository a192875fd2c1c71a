//! Consumer error types

use rowpipe_common::PipelineError;
use thiserror::Error;

pub type ConsumerResult<T> = Result<T, ConsumerError>;

#[derive(Error, Debug)]
pub enum ConsumerError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Parameter store error for '{name}': {message}")]
    ParameterStore { name: String, message: String },

    #[error("Parameter '{0}' has no value")]
    MissingParameter(String),

    #[error("Invocation received no records")]
    EmptyBatch,

    #[error("Invalid message {message_id}: {reason}")]
    InvalidMessage { message_id: String, reason: String },

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ConsumerError {
    pub fn invalid_message(message_id: &str, reason: impl std::fmt::Display) -> Self {
        Self::InvalidMessage {
            message_id: message_id.to_string(),
            reason: reason.to_string(),
        }
    }
}
