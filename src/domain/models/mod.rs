pub mod config;
pub mod lattice;
pub mod operation;
pub mod specification;

pub use config::{Config, DatabaseConfig, LoggingConfig, RetryConfig, SchedulerConfig};
pub use lattice::{ConfidenceVector, SignLatticeElement, Threshold};
pub use operation::{OperationError, OperationHandle, OperationName};
pub use specification::{
    ArtifactHandle, ArtifactId, FunctionRef, Specification, SpecificationsRequest,
    SpecificationsResponse,
};
