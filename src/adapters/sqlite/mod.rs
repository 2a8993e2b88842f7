//! SQLite adapters for the result store.

pub mod connection;
pub mod result_store;

pub use connection::{create_pool, create_test_pool, ConnectionError, PoolConfig};
pub use result_store::SqliteResultStore;
