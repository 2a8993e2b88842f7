//! Adapters for external systems.

pub mod mock;
pub mod sqlite;

pub use mock::{MockBehavior, MockOperationClient};
pub use sqlite::SqliteResultStore;
