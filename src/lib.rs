//! Errspec - Remote Analysis Job Coordinator
//!
//! Errspec coordinates large batches of long-running remote analysis jobs
//! against a fixed concurrency budget, commits each result exactly once into
//! a deduplicated document archive, and resolves multi-channel confidence
//! measurements into discrete sign-lattice classifications for reporting.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, ports and pure decision procedures
//! - **Application Layer** (`application`): the scheduler and run orchestration
//! - **Adapters** (`adapters`): SQLite result store, mock operation client
//! - **Infrastructure Layer** (`infrastructure`): configuration loading
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use errspec::adapters::MockOperationClient;
//! use errspec::application::OperationScheduler;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let scheduler = OperationScheduler::new(Arc::new(MockOperationClient::new()));
//!     // scheduler.run_to_completion(requests, 4, |request, handle| async { Ok(()) }).await?;
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use application::{
    AnalysisRunner, OperationScheduler, RetryPolicy, RunOutcome, SpecificationArchive,
};
pub use domain::models::{
    ArtifactHandle, ArtifactId, Config, ConfidenceVector, OperationError, OperationHandle,
    OperationName, SignLatticeElement, Specification, SpecificationsRequest,
    SpecificationsResponse, Threshold,
};
pub use domain::ports::{OperationClient, ResultStore, StoreError};
pub use infrastructure::config::{ConfigError, ConfigLoader};
