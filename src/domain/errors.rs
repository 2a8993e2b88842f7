//! Domain errors for the errspec coordinator.

use thiserror::Error;

use crate::domain::models::operation::OperationError;
use crate::domain::models::specification::ArtifactId;

/// Errors raised by the lattice resolution surface.
///
/// Resolution itself is total; the only contract violation is an invalid
/// threshold, which is rejected at construction time.
#[derive(Error, Debug)]
pub enum LatticeError {
    #[error("Invalid confidence threshold: {0}. Must be between 1 and 100")]
    InvalidThreshold(u8),
}

/// Errors surfaced by a `run_to_completion` call.
///
/// Transient remote faults never appear here; the retry policy absorbs them.
/// What does appear is a caller contract violation, a permanent rejection
/// from the remote service, or a failed commit callback, all fatal to the
/// run.
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("max_in_flight must be at least 1")]
    InvalidMaxInFlight,

    #[error("Duplicate unique key in request batch: {0}")]
    DuplicateKey(ArtifactId),

    #[error("Submission for {key} failed: {source}")]
    Submit {
        key: ArtifactId,
        #[source]
        source: OperationError,
    },

    #[error("Polling operation {operation} for {key} failed: {source}")]
    Poll {
        key: ArtifactId,
        operation: String,
        #[source]
        source: OperationError,
    },

    #[error("Commit callback failed for {key}: {source}")]
    Commit {
        key: ArtifactId,
        #[source]
        source: anyhow::Error,
    },
}
