//! Admission-and-completion scheduler for long-running remote operations.

use std::collections::{HashSet, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future;
use tokio::time::sleep;
use tracing::{debug, info, instrument};

use crate::application::retry::RetryPolicy;
use crate::domain::errors::SchedulerError;
use crate::domain::models::config::SchedulerConfig;
use crate::domain::models::operation::{OperationHandle, OperationName};
use crate::domain::models::specification::ArtifactId;
use crate::domain::ports::OperationClient;

/// Bookkeeping for one outstanding submission.
struct PendingEntry<R> {
    key: ArtifactId,
    request: R,
    name: OperationName,
}

/// Drives a batch of requests through a remote operation surface under a
/// fixed concurrency budget.
///
/// One `run_to_completion` call owns its bookkeeping exclusively: requests
/// are admitted in insertion order while the budget has room, all
/// outstanding operations are polled once per round (the polls fan out
/// concurrently and rejoin before anything else happens), and every
/// completion fires the commit callback exactly once, sequentially, on this
/// coordinator's control path, so callbacks from the same run never race
/// each other into the store.
///
/// There is no per-job timeout and no cancellation: a job that never
/// reports done stalls the run until the process dies. Transient remote
/// faults are absorbed by the retry policy; with the default unbounded
/// policy a persistent outage presents as an infinite hang.
pub struct OperationScheduler<C: OperationClient> {
    client: Arc<C>,
    retry: RetryPolicy,
    idle_backoff: Duration,
}

impl<C: OperationClient> OperationScheduler<C> {
    /// Scheduler with default timing: unbounded one-second retries and a
    /// five-second idle backoff between fruitless rounds.
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            retry: RetryPolicy::default(),
            idle_backoff: Duration::from_secs(5),
        }
    }

    pub fn from_config(client: Arc<C>, config: &SchedulerConfig) -> Self {
        Self {
            client,
            retry: RetryPolicy::from(&config.retry),
            idle_backoff: Duration::from_millis(config.idle_backoff_ms),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_idle_backoff(mut self, idle_backoff: Duration) -> Self {
        self.idle_backoff = idle_backoff;
        self
    }

    /// Submit every request and wait until all have completed.
    ///
    /// `requests` pairs each unique key with its payload; admission follows
    /// the pair order. At most `max_in_flight` operations are outstanding at
    /// any point. `on_complete` is invoked exactly once per key, after that
    /// key's operation reports done, with the original request and the
    /// terminal handle; an error from it aborts the run.
    ///
    /// Returns whether at least one request reached completion; `false`
    /// only for an empty batch.
    #[instrument(
        skip(self, requests, on_complete),
        fields(total = requests.len(), max_in_flight)
    )]
    pub async fn run_to_completion<F, Fut>(
        &self,
        requests: Vec<(ArtifactId, C::Request)>,
        max_in_flight: usize,
        mut on_complete: F,
    ) -> Result<bool, SchedulerError>
    where
        F: FnMut(C::Request, OperationHandle) -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        if max_in_flight == 0 {
            return Err(SchedulerError::InvalidMaxInFlight);
        }

        let mut seen = HashSet::new();
        for (key, _) in &requests {
            if !seen.insert(key.clone()) {
                return Err(SchedulerError::DuplicateKey(key.clone()));
            }
        }

        let total = requests.len();
        let mut unsubmitted: VecDeque<(ArtifactId, C::Request)> = requests.into();
        let mut pending: Vec<PendingEntry<C::Request>> = Vec::new();
        let mut completed = 0usize;

        while !unsubmitted.is_empty() || !pending.is_empty() {
            // Admission: fill the budget from the head of the queue.
            while pending.len() < max_in_flight {
                let Some((key, request)) = unsubmitted.pop_front() else {
                    break;
                };

                info!(
                    key = %key,
                    remaining = unsubmitted.len(),
                    in_flight = pending.len() + 1,
                    max_in_flight,
                    "Submitting operation"
                );

                let handle = self
                    .retry
                    .execute(|| {
                        let client = Arc::clone(&self.client);
                        let request = request.clone();
                        async move { client.submit(&request).await }
                    })
                    .await
                    .map_err(|source| SchedulerError::Submit {
                        key: key.clone(),
                        source,
                    })?;

                pending.push(PendingEntry {
                    key,
                    request,
                    name: handle.name,
                });
            }

            // Poll round: fan out over the pending set, rejoin before
            // touching any bookkeeping.
            let polls: Vec<_> = pending
                .iter()
                .map(|entry| {
                    let client = Arc::clone(&self.client);
                    let retry = self.retry.clone();
                    let name = entry.name.clone();
                    async move {
                        retry
                            .execute(|| {
                                let client = Arc::clone(&client);
                                let name = name.clone();
                                async move { client.poll(&name).await }
                            })
                            .await
                    }
                })
                .collect();
            let results = future::join_all(polls).await;

            let mut finished = Vec::new();
            for (index, result) in results.into_iter().enumerate() {
                let handle = result.map_err(|source| SchedulerError::Poll {
                    key: pending[index].key.clone(),
                    operation: pending[index].name.to_string(),
                    source,
                })?;
                if handle.done {
                    finished.push((index, handle));
                }
            }

            let progressed = !finished.is_empty();

            // Completions are committed sequentially on this control path.
            // Descending index order keeps the earlier indices valid.
            for (index, handle) in finished.into_iter().rev() {
                let entry = pending.remove(index);
                completed += 1;
                debug!(
                    key = %entry.key,
                    operation = %entry.name,
                    completed,
                    total,
                    "Operation completed"
                );
                on_complete(entry.request, handle)
                    .await
                    .map_err(|source| SchedulerError::Commit {
                        key: entry.key,
                        source,
                    })?;
            }

            // Only a fruitless round sleeps; progress refills the budget
            // immediately.
            if !progressed && !pending.is_empty() {
                sleep(self.idle_backoff).await;
            }
        }

        Ok(completed > 0)
    }
}
