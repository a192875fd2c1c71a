//! In-memory stand-ins for the consumer's external services
//!
//! - [`FakeParameterStore`] answers every name with `value:{name}` and records
//!   each lookup
//! - [`RecordingDeleter`] records deleted receipt handles and can be told to
//!   fail for specific ones
//! - [`InMemoryDb`] is a `users` table keyed by name with staged,
//!   all-or-nothing transactions; names starting with `fail` make the upsert
//!   error like a constraint violation would

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use aws_lambda_events::event::sqs::SqsEvent;
use chrono::{DateTime, Utc};
use rowpipe_common::{queue::MessageDeleter, PipelineError};
use rowpipe_consumer::{
    credentials::{CredentialCache, DbCredentials},
    db::{NewUser, StoreFactory, UserStore, UserTransaction},
    error::{ConsumerError, ConsumerResult},
    params::ParameterStore,
    ConsumerHandler,
};
use serde_json::json;

// ============================================================================
// Parameter store
// ============================================================================

#[derive(Default)]
pub struct FakeParameterStore {
    pub calls: Mutex<Vec<String>>,
    /// Lookups of names starting with this prefix fail
    pub fail_prefix: Option<String>,
}

impl FakeParameterStore {
    pub fn failing() -> Self {
        Self::failing_for("/")
    }

    pub fn failing_for(prefix: &str) -> Self {
        Self {
            fail_prefix: Some(prefix.to_string()),
            ..Default::default()
        }
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|n| *n == name).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ParameterStore for FakeParameterStore {
    async fn get_parameter(&self, name: &str, with_decryption: bool) -> ConsumerResult<String> {
        assert!(with_decryption, "parameters must be requested with decryption");
        self.calls.lock().unwrap().push(name.to_string());
        if self
            .fail_prefix
            .as_deref()
            .is_some_and(|prefix| name.starts_with(prefix))
        {
            return Err(ConsumerError::ParameterStore {
                name: name.to_string(),
                message: "AccessDenied".to_string(),
            });
        }
        Ok(format!("value:{}", name))
    }
}

// ============================================================================
// Queue
// ============================================================================

#[derive(Default)]
pub struct RecordingDeleter {
    pub deleted: Mutex<Vec<String>>,
    pub fail_for: HashSet<String>,
}

impl RecordingDeleter {
    pub fn failing_for(handles: &[&str]) -> Self {
        Self {
            fail_for: handles.iter().map(|h| h.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn deleted(&self) -> Vec<String> {
        let mut deleted = self.deleted.lock().unwrap().clone();
        deleted.sort();
        deleted
    }
}

#[async_trait]
impl MessageDeleter for RecordingDeleter {
    async fn delete(&self, receipt_handle: &str) -> rowpipe_common::Result<()> {
        if self.fail_for.contains(receipt_handle) {
            return Err(PipelineError::queue("ReceiptHandleIsInvalid"));
        }
        self.deleted.lock().unwrap().push(receipt_handle.to_string());
        Ok(())
    }
}

// ============================================================================
// Database
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUser {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct InMemoryDb {
    pub users: Mutex<BTreeMap<String, StoredUser>>,
    pub opened_with: Mutex<Vec<DbCredentials>>,
    pub closed: AtomicUsize,
    pub rollbacks: AtomicUsize,
}

impl InMemoryDb {
    pub fn user(&self, name: &str) -> Option<StoredUser> {
        self.users.lock().unwrap().get(name).cloned()
    }

    pub fn user_names(&self) -> Vec<String> {
        self.users.lock().unwrap().keys().cloned().collect()
    }

    pub fn opened(&self) -> usize {
        self.opened_with.lock().unwrap().len()
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryFactory(pub Arc<InMemoryDb>);

pub struct InMemoryStore(Arc<InMemoryDb>);

pub struct InMemoryTx {
    db: Arc<InMemoryDb>,
    staged: Vec<NewUser>,
}

#[async_trait]
impl StoreFactory for InMemoryFactory {
    type Store = InMemoryStore;

    async fn open(&self, credentials: &DbCredentials) -> ConsumerResult<Self::Store> {
        self.0.opened_with.lock().unwrap().push(credentials.clone());
        Ok(InMemoryStore(self.0.clone()))
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    type Tx = InMemoryTx;

    async fn begin(&self) -> ConsumerResult<Self::Tx> {
        Ok(InMemoryTx {
            db: self.0.clone(),
            staged: Vec::new(),
        })
    }

    async fn close(&self) {
        self.0.closed.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl UserTransaction for InMemoryTx {
    async fn upsert_user(&mut self, user: &NewUser) -> ConsumerResult<()> {
        if user.name.starts_with("fail") {
            return Err(ConsumerError::InvalidRecord(format!(
                "constraint violation for {}",
                user.name
            )));
        }
        self.staged.push(user.clone());
        Ok(())
    }

    async fn commit(self) -> ConsumerResult<()> {
        let mut users = self.db.users.lock().unwrap();
        for user in self.staged {
            users
                .entry(user.name.clone())
                .and_modify(|existing| existing.updated_at = user.timestamp)
                .or_insert_with(|| StoredUser {
                    id: user.id.to_string(),
                    name: user.name.clone(),
                    created_at: user.timestamp,
                    updated_at: user.timestamp,
                });
        }
        Ok(())
    }

    async fn rollback(self) -> ConsumerResult<()> {
        self.db.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub parameters: Arc<FakeParameterStore>,
    pub deleter: Arc<RecordingDeleter>,
    pub db: Arc<InMemoryDb>,
    pub handler: ConsumerHandler<InMemoryFactory>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(FakeParameterStore::default(), RecordingDeleter::default())
    }

    pub fn with(parameters: FakeParameterStore, deleter: RecordingDeleter) -> Self {
        let parameters = Arc::new(parameters);
        let deleter = Arc::new(deleter);
        let factory = InMemoryFactory::default();
        let db = factory.0.clone();

        let handler = ConsumerHandler::new(
            parameters.clone(),
            deleter.clone(),
            Arc::new(CredentialCache::new()),
            factory,
        );

        Self {
            parameters,
            deleter,
            db,
            handler,
        }
    }
}

/// Build a delivery whose messages are `(message_id, body)`; receipt
/// handles are `rh-{message_id}`
pub fn sqs_event(messages: &[(String, String)]) -> SqsEvent {
    let records: Vec<_> = messages
        .iter()
        .map(|(id, body)| {
            json!({
                "messageId": id,
                "receiptHandle": format!("rh-{}", id),
                "body": body,
                "attributes": {
                    "MessageGroupId": "CSVChunkGroup",
                    "ApproximateReceiveCount": "1"
                },
                "messageAttributes": {},
                "md5OfBody": "",
                "eventSource": "aws:sqs",
                "eventSourceARN": "arn:aws:sqs:us-east-1:123456789012:rows.fifo",
                "awsRegion": "us-east-1"
            })
        })
        .collect();

    serde_json::from_value(json!({ "Records": records })).unwrap()
}

/// Envelope body for a user row
pub fn user_body(name: &str, env: &str) -> String {
    json!({ "data": { "name": name }, "env": env }).to_string()
}

/// `count` messages `m0..` for users `{prefix}0..` in `env`
pub fn user_messages(prefix: &str, env: &str, count: usize) -> Vec<(String, String)> {
    (0..count)
        .map(|i| (format!("m{}", i), user_body(&format!("{}{}", prefix, i), env)))
        .collect()
}
