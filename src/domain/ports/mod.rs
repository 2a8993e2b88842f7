//! Port trait definitions (Hexagonal Architecture)
//!
//! Async trait interfaces that adapters must implement:
//! - `OperationClient`: submit/poll surface of the remote analysis services
//! - `ResultStore`: deduplicated request/response document store
//!
//! These contracts keep the coordinator independent of the wire transport
//! and of the document engine behind the store.

pub mod operation_client;
pub mod result_store;

pub use operation_client::OperationClient;
pub use result_store::{merge_pair, ResultStore, StoreError, StoredDocument, REQUEST_FIELD};
