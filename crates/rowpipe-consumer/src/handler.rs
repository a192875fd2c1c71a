//! Queue delivery handler

use std::sync::Arc;

use aws_lambda_events::event::sqs::SqsEvent;
use rowpipe_common::{queue::MessageDeleter, HandlerResponse};
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::{
    credentials::CredentialCache,
    db::{NewUser, StoreFactory, UserStore, UserTransaction},
    error::{ConsumerError, ConsumerResult},
    params::ParameterStore,
    records::{group_by_env, parse_records, QueueRecord},
    worker::{run_windowed, TaskOutcome, CONCURRENCY_LIMIT},
};

/// Outcome of one delivered message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordReport {
    pub message_id: String,
    pub env: String,
    #[serde(flatten)]
    pub outcome: TaskOutcome,
}

/// Per-record outcomes of an invocation, in delivery order per environment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub records: Vec<RecordReport>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.records.iter().all(|r| r.outcome.is_success())
    }

    pub fn committed(&self) -> usize {
        self.count(|o| matches!(o, TaskOutcome::Succeeded))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, TaskOutcome::Failed(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, TaskOutcome::Skipped))
    }

    fn count(&self, predicate: impl Fn(&TaskOutcome) -> bool) -> usize {
        self.records.iter().filter(|r| predicate(&r.outcome)).count()
    }

    fn push_all(&mut self, env: &str, records: &[QueueRecord], outcomes: Vec<TaskOutcome>) {
        self.records
            .extend(records.iter().zip(outcomes).map(|(record, outcome)| RecordReport {
                message_id: record.message_id.clone(),
                env: env.to_string(),
                outcome,
            }));
    }
}

pub struct ConsumerHandler<F: StoreFactory> {
    parameters: Arc<dyn ParameterStore>,
    deleter: Arc<dyn MessageDeleter>,
    credentials: Arc<CredentialCache>,
    stores: F,
}

impl<F: StoreFactory> ConsumerHandler<F> {
    /// `credentials` should be created once per process and shared
    pub fn new(
        parameters: Arc<dyn ParameterStore>,
        deleter: Arc<dyn MessageDeleter>,
        credentials: Arc<CredentialCache>,
        stores: F,
    ) -> Self {
        Self {
            parameters,
            deleter,
            credentials,
            stores,
        }
    }

    /// Run one invocation and map the outcome onto the response contract
    pub async fn handle(&self, event: &SqsEvent) -> HandlerResponse {
        match self.process(event).await {
            Ok(report) if report.is_success() => {
                info!(committed = report.committed(), "Batch applied");
                HandlerResponse::success("success")
            },
            Ok(report) => {
                warn!(
                    committed = report.committed(),
                    failed = report.failed(),
                    skipped = report.skipped(),
                    "Batch partially applied"
                );
                let body = serde_json::to_string(&report)
                    .unwrap_or_else(|e| format!("batch failed; report unavailable: {}", e));
                HandlerResponse::error(body)
            },
            Err(e) => {
                error!(error = %e, "Batch failed");
                HandlerResponse::error(e.to_string())
            },
        }
    }

    /// Apply every delivered record
    ///
    /// Returns `Err` only when the batch itself is unusable (empty or
    /// undecodable). Once records are decoded every one of them appears in
    /// the report: a group whose credentials or pool cannot be obtained is
    /// reported as failed, and groups after a failure as skipped.
    #[instrument(skip_all, fields(records = event.records.len()))]
    pub async fn process(&self, event: &SqsEvent) -> ConsumerResult<BatchReport> {
        let records = parse_records(&event.records)?;
        let groups = group_by_env(records);

        if groups.len() > 1 {
            warn!(
                envs = ?groups.iter().map(|(env, _)| env.as_str()).collect::<Vec<_>>(),
                "Batch mixes environments; processing each separately"
            );
        }

        let mut report = BatchReport::default();

        for (env, records) in &groups {
            if !report.is_success() {
                report.push_all(env, records, vec![TaskOutcome::Skipped; records.len()]);
                continue;
            }

            let outcomes = match self.process_env(env, records).await {
                Ok(outcomes) => outcomes,
                Err(e) => {
                    error!(env = %env, error = %e, "Environment group failed");
                    vec![TaskOutcome::Failed(e.to_string()); records.len()]
                },
            };
            report.push_all(env, records, outcomes);
        }

        Ok(report)
    }

    #[instrument(skip(self, records), fields(records = records.len()))]
    async fn process_env(
        &self,
        env: &str,
        records: &[QueueRecord],
    ) -> ConsumerResult<Vec<TaskOutcome>> {
        let credentials = self
            .credentials
            .get_or_fetch(env, self.parameters.as_ref())
            .await?;

        let pool = self.stores.open(&credentials).await?;
        let (store, deleter) = (&pool, self.deleter.as_ref());

        let outcomes = run_windowed(records, CONCURRENCY_LIMIT, move |record| {
            apply_record(store, deleter, record)
        })
        .await;

        pool.close().await;

        Ok(outcomes)
    }
}

/// Upsert one record and delete its message inside a single transaction
///
/// On any failure the transaction is rolled back and the message stays on the
/// queue. The connection goes back to the pool when the transaction ends.
#[instrument(skip_all, fields(message_id = %record.message_id))]
pub async fn apply_record<S: UserStore>(
    store: &S,
    deleter: &dyn MessageDeleter,
    record: &QueueRecord,
) -> ConsumerResult<()> {
    let user = NewUser::from_row(&record.envelope.data)?;
    let mut tx = store.begin().await?;

    let applied = async {
        tx.upsert_user(&user).await?;
        deleter.delete(&record.receipt_handle).await?;
        Ok::<_, ConsumerError>(())
    }
    .await;

    match applied {
        Ok(()) => {
            tx.commit().await?;
            info!(name = %user.name, "Record committed");
            Ok(())
        },
        Err(e) => {
            if let Err(rollback) = tx.rollback().await {
                warn!(error = %rollback, "Rollback failed");
            }
            error!(error = %e, "Record rolled back");
            Err(e)
        },
    }
}
