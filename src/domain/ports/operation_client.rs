use async_trait::async_trait;

use crate::domain::models::operation::{OperationError, OperationHandle, OperationName};

/// Port for submitting and polling long-running remote operations.
///
/// Implementations call into an external analysis service; the coordinator
/// only knows "submit a job, get back an operation handle" and "poll a
/// handle for completion".
#[async_trait]
pub trait OperationClient: Send + Sync {
    /// The request payload this client submits. Opaque to the scheduler.
    type Request: Clone + Send + Sync;

    /// Submit a job and receive its pollable handle.
    ///
    /// A [`OperationError::Transport`] fault is retryable; a rejection means
    /// the request itself is malformed and must propagate to the caller.
    async fn submit(&self, request: &Self::Request) -> Result<OperationHandle, OperationError>;

    /// Poll an operation for its current state.
    ///
    /// Must be idempotent: polling an already-done operation returns the
    /// same terminal handle again. Callers are expected not to poll a handle
    /// after observing `done == true` once.
    async fn poll(&self, name: &OperationName) -> Result<OperationHandle, OperationError>;
}
