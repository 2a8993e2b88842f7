//! Long-running operation handles.
//!
//! Remote analysis services accept a job and hand back an opaque, globally
//! unique operation name. The coordinator polls that name until the service
//! reports the operation done, at which point the refreshed handle carries
//! the terminal response document.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Opaque, globally unique identifier for one submitted operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationName(String);

impl OperationName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OperationName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Snapshot of a remote operation's state.
///
/// A handle is valid only while its job is tracked; once `done` has been
/// observed `true` the handle must not be polled again. The terminal
/// `response` is a JSON document, the same shape the result store persists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationHandle {
    pub name: OperationName,
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<JsonValue>,
}

impl OperationHandle {
    /// A freshly submitted, not-yet-done handle.
    pub fn pending(name: OperationName) -> Self {
        Self {
            name,
            done: false,
            response: None,
        }
    }

    /// A terminal handle carrying the final response document.
    pub fn finished(name: OperationName, response: JsonValue) -> Self {
        Self {
            name,
            done: true,
            response: Some(response),
        }
    }
}

/// Failure modes of the remote operation surface.
///
/// The split matters to the scheduler: transport faults are retried by
/// policy, rejections are caller bugs and propagate immediately.
#[derive(Error, Debug, Clone)]
pub enum OperationError {
    /// Transport-level fault (connection refused, reset, service restart).
    #[error("Transport fault: {0}")]
    Transport(String),

    /// The service rejected the request as malformed. Not retried.
    #[error("Request rejected by service: {0}")]
    Rejected(String),

    /// The service does not know the polled operation. Not retried.
    #[error("Unknown operation: {0}")]
    UnknownOperation(OperationName),
}

impl OperationError {
    /// Whether the retry loop should absorb this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
