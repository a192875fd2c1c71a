//! Delivered message decoding and environment grouping

use aws_lambda_events::event::sqs::SqsMessage;
use rowpipe_common::envelope::Envelope;

use crate::error::{ConsumerError, ConsumerResult};

/// A delivered message with its decoded envelope
#[derive(Debug, Clone, PartialEq)]
pub struct QueueRecord {
    pub message_id: String,
    pub receipt_handle: String,
    pub envelope: Envelope,
}

impl QueueRecord {
    pub fn from_message(message: &SqsMessage) -> ConsumerResult<Self> {
        let message_id = message.message_id.clone().unwrap_or_default();

        let receipt_handle = message
            .receipt_handle
            .clone()
            .filter(|handle| !handle.is_empty())
            .ok_or_else(|| ConsumerError::invalid_message(&message_id, "missing receipt handle"))?;

        let body = message
            .body
            .as_deref()
            .ok_or_else(|| ConsumerError::invalid_message(&message_id, "missing body"))?;

        let envelope = Envelope::from_body(body)
            .map_err(|e| ConsumerError::invalid_message(&message_id, e))?;

        Ok(Self {
            message_id,
            receipt_handle,
            envelope,
        })
    }

    pub fn env(&self) -> &str {
        &self.envelope.env
    }
}

/// Decode every message; any undecodable message fails the whole batch
pub fn parse_records(messages: &[SqsMessage]) -> ConsumerResult<Vec<QueueRecord>> {
    if messages.is_empty() {
        return Err(ConsumerError::EmptyBatch);
    }

    messages.iter().map(QueueRecord::from_message).collect()
}

/// Group records by environment
///
/// Groups are ordered by first appearance and keep delivery order inside.
pub fn group_by_env(records: Vec<QueueRecord>) -> Vec<(String, Vec<QueueRecord>)> {
    let mut groups: Vec<(String, Vec<QueueRecord>)> = Vec::new();

    for record in records {
        match groups.iter_mut().find(|(env, _)| *env == record.env()) {
            Some((_, group)) => group.push(record),
            None => groups.push((record.env().to_string(), vec![record])),
        }
    }

    groups
}
