//! Mock operation client for testing.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::models::operation::{OperationError, OperationHandle, OperationName};
use crate::domain::models::specification::{
    ArtifactId, SpecificationsRequest, SpecificationsResponse,
};
use crate::domain::ports::OperationClient;

/// Scripted behavior for one artifact's operation.
#[derive(Debug, Clone, Default)]
pub struct MockBehavior {
    /// Polls answered "not done" before the operation completes.
    pub polls_until_done: u32,
    /// Transient faults injected before a submission is accepted.
    pub transient_submit_failures: u32,
    /// Transient faults injected before polls start answering.
    pub transient_poll_failures: u32,
    /// Reject the submission outright (permanent, not retried).
    pub reject_submission: bool,
    /// Terminal payload; defaults to an empty specifications response.
    pub response: Option<JsonValue>,
}

impl MockBehavior {
    /// Complete after `polls` additional not-done polls.
    pub fn done_after(polls: u32) -> Self {
        Self {
            polls_until_done: polls,
            ..Default::default()
        }
    }

    pub fn rejecting() -> Self {
        Self {
            reject_submission: true,
            ..Default::default()
        }
    }

    pub fn with_response(mut self, response: JsonValue) -> Self {
        self.response = Some(response);
        self
    }

    pub fn with_transient_submit_failures(mut self, failures: u32) -> Self {
        self.transient_submit_failures = failures;
        self
    }

    pub fn with_transient_poll_failures(mut self, failures: u32) -> Self {
        self.transient_poll_failures = failures;
        self
    }

    fn terminal_response(&self) -> JsonValue {
        self.response.clone().unwrap_or_else(|| {
            serde_json::to_value(SpecificationsResponse::default())
                .expect("empty response serializes")
        })
    }
}

struct OperationState {
    polls_remaining: u32,
    poll_faults_remaining: u32,
    response: JsonValue,
    done: bool,
}

/// Mock operation client with per-artifact scripted behavior.
///
/// Tracks the number of operations outstanding at the "service" and the
/// high-water mark of that count, so tests can assert the admission budget
/// was honored, and counts polls issued against already-done operations,
/// which the scheduler contract forbids.
pub struct MockOperationClient {
    default_behavior: MockBehavior,
    behavior_overrides: RwLock<HashMap<ArtifactId, MockBehavior>>,
    submit_faults: RwLock<HashMap<ArtifactId, u32>>,
    operations: RwLock<HashMap<OperationName, OperationState>>,
    submit_calls: AtomicU32,
    poll_calls: AtomicU32,
    polls_after_done: AtomicU32,
    in_flight: AtomicUsize,
    max_in_flight_seen: AtomicUsize,
}

impl MockOperationClient {
    pub fn new() -> Self {
        Self::with_default_behavior(MockBehavior::default())
    }

    pub fn with_default_behavior(behavior: MockBehavior) -> Self {
        Self {
            default_behavior: behavior,
            behavior_overrides: RwLock::new(HashMap::new()),
            submit_faults: RwLock::new(HashMap::new()),
            operations: RwLock::new(HashMap::new()),
            submit_calls: AtomicU32::new(0),
            poll_calls: AtomicU32::new(0),
            polls_after_done: AtomicU32::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight_seen: AtomicUsize::new(0),
        }
    }

    /// Script a specific behavior for one artifact.
    pub async fn set_behavior(&self, artifact_id: ArtifactId, behavior: MockBehavior) {
        let mut overrides = self.behavior_overrides.write().await;
        overrides.insert(artifact_id, behavior);
    }

    pub fn submit_calls(&self) -> u32 {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn poll_calls(&self) -> u32 {
        self.poll_calls.load(Ordering::SeqCst)
    }

    /// Polls issued against operations that had already reported done.
    pub fn polls_after_done(&self) -> u32 {
        self.polls_after_done.load(Ordering::SeqCst)
    }

    /// Highest number of operations outstanding at any point.
    pub fn max_in_flight_seen(&self) -> usize {
        self.max_in_flight_seen.load(Ordering::SeqCst)
    }

    async fn behavior_for(&self, artifact_id: &ArtifactId) -> MockBehavior {
        let overrides = self.behavior_overrides.read().await;
        overrides
            .get(artifact_id)
            .cloned()
            .unwrap_or_else(|| self.default_behavior.clone())
    }
}

impl Default for MockOperationClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OperationClient for MockOperationClient {
    type Request = SpecificationsRequest;

    async fn submit(&self, request: &Self::Request) -> Result<OperationHandle, OperationError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        let artifact_id = request.artifact.id.clone();
        let behavior = self.behavior_for(&artifact_id).await;

        {
            let mut faults = self.submit_faults.write().await;
            let remaining = faults
                .entry(artifact_id.clone())
                .or_insert(behavior.transient_submit_failures);
            if *remaining > 0 {
                *remaining -= 1;
                return Err(OperationError::Transport(format!(
                    "injected submit fault for {artifact_id}"
                )));
            }
        }

        if behavior.reject_submission {
            return Err(OperationError::Rejected(format!(
                "malformed request for {artifact_id}"
            )));
        }

        let name = OperationName::new(format!("operations/{}", Uuid::new_v4()));
        let mut operations = self.operations.write().await;
        operations.insert(
            name.clone(),
            OperationState {
                polls_remaining: behavior.polls_until_done,
                poll_faults_remaining: behavior.transient_poll_failures,
                response: behavior.terminal_response(),
                done: false,
            },
        );

        let outstanding = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight_seen
            .fetch_max(outstanding, Ordering::SeqCst);

        Ok(OperationHandle::pending(name))
    }

    async fn poll(&self, name: &OperationName) -> Result<OperationHandle, OperationError> {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);
        let mut operations = self.operations.write().await;
        let Some(state) = operations.get_mut(name) else {
            return Err(OperationError::UnknownOperation(name.clone()));
        };

        // Idempotent terminal state, as the operations surface requires.
        if state.done {
            self.polls_after_done.fetch_add(1, Ordering::SeqCst);
            return Ok(OperationHandle::finished(
                name.clone(),
                state.response.clone(),
            ));
        }

        if state.poll_faults_remaining > 0 {
            state.poll_faults_remaining -= 1;
            return Err(OperationError::Transport(format!(
                "injected poll fault for {name}"
            )));
        }

        if state.polls_remaining > 0 {
            state.polls_remaining -= 1;
            return Ok(OperationHandle::pending(name.clone()));
        }

        state.done = true;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(OperationHandle::finished(
            name.clone(),
            state.response.clone(),
        ))
    }
}
