pub mod archive;
pub mod retry;
pub mod runner;
pub mod scheduler;

pub use archive::{ArchivedRun, SpecificationArchive};
pub use retry::RetryPolicy;
pub use runner::{AnalysisRunner, RunOutcome};
pub use scheduler::OperationScheduler;
