use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::domain::models::specification::ArtifactId;

/// Field name the request document is merged under inside a stored record.
pub const REQUEST_FIELD: &str = "request";

/// Errors from the result store port.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Record for artifact {artifact_id} already exists in collection {collection}")]
    Duplicate {
        collection: String,
        artifact_id: ArtifactId,
    },

    #[error("Response document already carries the reserved `{REQUEST_FIELD}` field")]
    ReservedField,

    #[error("Stored documents must be JSON objects")]
    NotAnObject,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// One persisted request/response record.
#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub collection: String,
    pub artifact_id: ArtifactId,
    /// Response document with the request merged under [`REQUEST_FIELD`].
    pub document: JsonValue,
    pub stored_at: DateTime<Utc>,
}

impl StoredDocument {
    /// Split the stored document back into its request and response parts.
    ///
    /// The returned response no longer contains the reserved field.
    pub fn into_pair(self) -> Result<(JsonValue, JsonValue), StoreError> {
        let JsonValue::Object(mut fields) = self.document else {
            return Err(StoreError::NotAnObject);
        };
        let request = fields.remove(REQUEST_FIELD).unwrap_or(JsonValue::Null);
        Ok((request, JsonValue::Object(fields)))
    }
}

/// Merge a request document into a response document under the reserved
/// [`REQUEST_FIELD`], producing the record body that gets persisted.
pub fn merge_pair(request: &JsonValue, response: &JsonValue) -> Result<JsonValue, StoreError> {
    let JsonValue::Object(response_fields) = response else {
        return Err(StoreError::NotAnObject);
    };
    if response_fields.contains_key(REQUEST_FIELD) {
        return Err(StoreError::ReservedField);
    }
    let mut merged = response_fields.clone();
    merged.insert(REQUEST_FIELD.to_string(), request.clone());
    Ok(JsonValue::Object(merged))
}

/// Port for the deduplicated request/response document store.
///
/// Records are keyed by `(collection, artifact_id)`; the id is extracted
/// from the typed request by the caller before it reaches this interface.
/// `insert_pair` performs no existence check of its own; callers guard with
/// [`ResultStore::exists`] or clear stale records first. Implementations
/// must still reject a duplicate key outright so the at-most-one invariant
/// holds even if a second writer slips in between check and act.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// True iff a record for `artifact_id` exists in `collection`.
    async fn exists(&self, collection: &str, artifact_id: &ArtifactId)
        -> Result<bool, StoreError>;

    /// Merge `request` into `response` under the reserved field and append
    /// the result as a new record.
    async fn insert_pair(
        &self,
        collection: &str,
        artifact_id: &ArtifactId,
        request: &JsonValue,
        response: &JsonValue,
    ) -> Result<(), StoreError>;

    /// Remove the record for one artifact. Returns the number of records
    /// removed (0 or 1).
    async fn delete_one(
        &self,
        collection: &str,
        artifact_id: &ArtifactId,
    ) -> Result<u64, StoreError>;

    /// Remove every record in a collection. Returns the number removed.
    async fn delete_all(&self, collection: &str) -> Result<u64, StoreError>;

    /// Point lookup of one record.
    async fn fetch(
        &self,
        collection: &str,
        artifact_id: &ArtifactId,
    ) -> Result<Option<StoredDocument>, StoreError>;

    /// All records in a collection, ordered by artifact id.
    async fn fetch_all(&self, collection: &str) -> Result<Vec<StoredDocument>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_places_request_under_reserved_field() {
        let request = json!({"artifact": {"id": "abc"}});
        let response = json!({"specifications": []});
        let merged = merge_pair(&request, &response).unwrap();
        assert_eq!(merged["request"]["artifact"]["id"], "abc");
        assert!(merged["specifications"].is_array());
    }

    #[test]
    fn merge_rejects_reserved_field_collision() {
        let request = json!({});
        let response = json!({"request": {}});
        assert!(matches!(
            merge_pair(&request, &response),
            Err(StoreError::ReservedField)
        ));
    }

    #[test]
    fn merge_rejects_non_object_response() {
        let request = json!({});
        let response = json!([1, 2, 3]);
        assert!(matches!(
            merge_pair(&request, &response),
            Err(StoreError::NotAnObject)
        ));
    }

    #[test]
    fn into_pair_inverts_merge() {
        let request = json!({"artifact": {"id": "abc"}});
        let response = json!({"specifications": [{"f": 1}]});
        let document = StoredDocument {
            collection: "specifications".to_string(),
            artifact_id: ArtifactId::new("abc"),
            document: merge_pair(&request, &response).unwrap(),
            stored_at: Utc::now(),
        };
        let (split_request, split_response) = document.into_pair().unwrap();
        assert_eq!(split_request, request);
        assert_eq!(split_response, response);
    }
}
