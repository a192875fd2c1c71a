//! Upload notification decoding

use aws_lambda_events::event::s3::S3Event;

use crate::error::{IngestError, IngestResult};

/// Object named by one upload notification record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub bucket: String,
    pub key: String,
}

/// Extract every bucket/key pair from an S3 notification, in record order
pub fn upload_targets(event: &S3Event) -> IngestResult<Vec<UploadTarget>> {
    event
        .records
        .iter()
        .map(|record| {
            let bucket = record
                .s3
                .bucket
                .name
                .as_deref()
                .filter(|name| !name.is_empty())
                .ok_or_else(|| IngestError::InvalidEvent("record without bucket name".into()))?;

            let raw_key = record
                .s3
                .object
                .key
                .as_deref()
                .filter(|key| !key.is_empty())
                .ok_or_else(|| IngestError::InvalidEvent("record without object key".into()))?;

            Ok(UploadTarget {
                bucket: bucket.to_string(),
                key: decode_key(raw_key)?,
            })
        })
        .collect()
}

/// Decode an S3 notification key (form encoding: `+` is a space)
pub fn decode_key(raw: &str) -> IngestResult<String> {
    let plus_decoded = raw.replace('+', " ");
    urlencoding::decode(&plus_decoded)
        .map(|key| key.into_owned())
        .map_err(|e| IngestError::InvalidEvent(format!("undecodable key '{}': {}", raw, e)))
}
