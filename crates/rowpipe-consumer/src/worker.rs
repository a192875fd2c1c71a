//! Bounded windowed execution
//!
//! Items run in consecutive windows of at most `window` tasks. Tasks inside a
//! window run concurrently and all of them finish, so one failure never
//! cancels a sibling mid-transaction. Once a window contains a failure, later
//! windows are not started and their items are reported as skipped.

use std::future::Future;

use futures::future::join_all;
use serde::Serialize;

use crate::error::ConsumerResult;

/// Records processed concurrently per window.
pub const CONCURRENCY_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "lowercase")]
pub enum TaskOutcome {
    Succeeded,
    Failed(String),
    /// Never started because an earlier window failed
    Skipped,
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Succeeded)
    }
}

/// Run `task` over `items` window by window; outcomes follow input order
pub async fn run_windowed<'a, T, F, Fut>(
    items: &'a [T],
    window: usize,
    task: F,
) -> Vec<TaskOutcome>
where
    F: Fn(&'a T) -> Fut,
    Fut: Future<Output = ConsumerResult<()>>,
{
    let window = window.max(1);
    let mut outcomes = Vec::with_capacity(items.len());
    let mut aborted = false;

    for chunk in items.chunks(window) {
        if aborted {
            outcomes.extend(chunk.iter().map(|_| TaskOutcome::Skipped));
            continue;
        }

        let results = join_all(chunk.iter().map(&task)).await;

        for result in results {
            match result {
                Ok(()) => outcomes.push(TaskOutcome::Succeeded),
                Err(e) => {
                    aborted = true;
                    outcomes.push(TaskOutcome::Failed(e.to_string()));
                },
            }
        }
    }

    outcomes
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::ConsumerError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_all_succeed() {
        let items: Vec<usize> = (0..25).collect();
        let outcomes = run_windowed(&items, 10, |_| async { Ok(()) }).await;

        assert_eq!(outcomes.len(), 25);
        assert!(outcomes.iter().all(TaskOutcome::is_success));
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded_by_window() {
        let (running, peak) = (AtomicUsize::new(0), AtomicUsize::new(0));
        let (running, peak) = (&running, &peak);
        let items: Vec<usize> = (0..23).collect();

        run_windowed(&items, 10, move |_| async move {
            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            running.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        })
        .await;

        assert_eq!(peak.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_failure_finishes_window_and_skips_rest() {
        let counter = AtomicUsize::new(0);
        let started = &counter;
        let items: Vec<usize> = (0..25).collect();

        let outcomes = run_windowed(&items, 10, move |item| {
            let item = *item;
            async move {
                started.fetch_add(1, Ordering::SeqCst);
                if item == 13 {
                    Err(ConsumerError::InvalidRecord("boom".into()))
                } else {
                    Ok(())
                }
            }
        })
        .await;

        assert_eq!(counter.load(Ordering::SeqCst), 20);
        assert!(outcomes[..10].iter().all(TaskOutcome::is_success));
        assert!(matches!(outcomes[13], TaskOutcome::Failed(ref e) if e.contains("boom")));
        assert!(outcomes[14].is_success());
        assert!(outcomes[20..].iter().all(|o| *o == TaskOutcome::Skipped));
    }

    #[tokio::test]
    async fn test_empty_input() {
        let items: Vec<usize> = Vec::new();
        let outcomes = run_windowed(&items, 10, |_| async { Ok(()) }).await;
        assert!(outcomes.is_empty());
    }
}
