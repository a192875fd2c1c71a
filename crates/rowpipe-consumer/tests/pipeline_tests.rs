//! Upload to database, with every external service in memory

mod common;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use aws_lambda_events::event::s3::S3Event;
use common::{sqs_event, Harness};
use rowpipe_common::queue::{MessagePublisher, QueueEntry};
use rowpipe_ingest::{
    config::{IngestConfig, DEFAULT_CSV_DELIMITER, DEFAULT_MESSAGE_GROUP_ID},
    storage::ObjectStore,
    IngestError, IngestHandler, IngestResult,
};
use serde_json::json;

struct SingleObject {
    bucket: String,
    key: String,
    data: Vec<u8>,
}

#[async_trait]
impl ObjectStore for SingleObject {
    async fn download(&self, bucket: &str, key: &str) -> IngestResult<Vec<u8>> {
        if bucket == self.bucket && key == self.key {
            Ok(self.data.clone())
        } else {
            Err(IngestError::storage(bucket, key, "NoSuchKey"))
        }
    }
}

#[derive(Default)]
struct CapturingQueue {
    batches: Mutex<Vec<Vec<QueueEntry>>>,
}

#[async_trait]
impl MessagePublisher for CapturingQueue {
    async fn send_batch(&self, entries: Vec<QueueEntry>) -> rowpipe_common::Result<()> {
        self.batches.lock().unwrap().push(entries);
        Ok(())
    }
}

fn upload_event(bucket: &str, key: &str) -> S3Event {
    serde_json::from_value(json!({
        "Records": [{
            "eventVersion": "2.1",
            "eventSource": "aws:s3",
            "awsRegion": "us-east-1",
            "eventTime": "2024-05-01T12:00:00.000Z",
            "eventName": "ObjectCreated:Put",
            "userIdentity": { "principalId": "AWS:EXAMPLE" },
            "requestParameters": { "sourceIPAddress": "127.0.0.1" },
            "responseElements": {},
            "s3": {
                "s3SchemaVersion": "1.0",
                "configurationId": "csv-upload",
                "bucket": {
                    "name": bucket,
                    "ownerIdentity": { "principalId": "EXAMPLE" },
                    "arn": format!("arn:aws:s3:::{}", bucket)
                },
                "object": {
                    "key": key,
                    "size": 42,
                    "eTag": "0123456789abcdef",
                    "sequencer": "0A1B2C3D4E5F678901"
                }
            }
        }]
    }))
    .unwrap()
}

async fn ingest(bucket: &str, key: &str, csv: &str) -> Vec<Vec<QueueEntry>> {
    let store = Arc::new(SingleObject {
        bucket: bucket.to_string(),
        key: key.to_string(),
        data: csv.as_bytes().to_vec(),
    });
    let queue = Arc::new(CapturingQueue::default());
    let config = IngestConfig {
        queue_url: "https://sqs.us-east-1.amazonaws.com/123456789012/rows.fifo".to_string(),
        region: None,
        message_group_id: DEFAULT_MESSAGE_GROUP_ID.to_string(),
        bucket_env_map: None,
        csv_delimiter: DEFAULT_CSV_DELIMITER,
    };

    let handler = IngestHandler::new(store, queue.clone(), &config).unwrap();
    let response = handler.handle(&upload_event(bucket, key)).await;
    assert!(response.is_success(), "ingest failed: {}", response.body);

    let batches = queue.batches.lock().unwrap().clone();
    batches
}

fn deliver(batch: &[QueueEntry]) -> Vec<(String, String)> {
    batch
        .iter()
        .map(|entry| (entry.id.clone(), entry.body.clone()))
        .collect()
}

#[tokio::test]
async fn test_two_row_upload_lands_in_dev_database() {
    let batches = ingest("myapp-dev-data", "batch1.csv", "id,name\n1,alice\n2,bob\n").await;

    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 2);
    assert!(batches[0].iter().all(|e| e.group_id == "CSVChunkGroup"));

    let harness = Harness::new();
    let messages = deliver(&batches[0]);
    let response = harness.handler.handle(&sqs_event(&messages)).await;

    assert!(response.is_success());
    assert_eq!(harness.parameters.total_calls(), 4);
    assert_eq!(harness.parameters.call_count("/dev/MYSQL_HOST"), 1);
    assert_eq!(harness.parameters.call_count("/dev/MYSQL_USER"), 1);
    assert_eq!(harness.parameters.call_count("/dev/MYSQL_PASSWORD"), 1);
    assert_eq!(harness.parameters.call_count("/dev/MYSQL_DATABASE"), 1);
    assert_eq!(harness.db.user_names(), vec!["alice", "bob"]);

    let mut expected: Vec<String> = batches[0].iter().map(|e| format!("rh-{}", e.id)).collect();
    expected.sort();
    assert_eq!(harness.deleter.deleted(), expected);
}

#[tokio::test]
async fn test_redelivered_upload_does_not_duplicate_users() {
    let csv = "id,name\n1,alice\n2,bob\n3,carol\n";
    let first = ingest("myapp-prod-data", "users.csv", csv).await;
    let second = ingest("myapp-prod-data", "users.csv", csv).await;

    let harness = Harness::new();
    for batch in first.iter().chain(second.iter()) {
        let response = harness.handler.handle(&sqs_event(&deliver(batch))).await;
        assert!(response.is_success());
    }

    assert_eq!(harness.db.user_names(), vec!["alice", "bob", "carol"]);
    assert_eq!(harness.deleter.deleted().len(), 6);
    // Cached after the first delivery
    assert_eq!(harness.parameters.call_count("/prod/MYSQL_HOST"), 1);
}
