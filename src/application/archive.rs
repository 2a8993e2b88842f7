//! Typed facade over the result store for the specifications collection.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::info;

use crate::domain::models::specification::{
    ArtifactId, SpecificationsRequest, SpecificationsResponse,
};
use crate::domain::ports::{ResultStore, StoreError};

/// Stored request/response pair for one artifact.
#[derive(Debug, Clone)]
pub struct ArchivedRun {
    pub request: SpecificationsRequest,
    pub response: SpecificationsResponse,
}

/// Read/write access to persisted specifications, keyed by artifact id.
///
/// Identity comes from the typed request (`request.artifact.id`), never from
/// a field path into the raw document. Writes do not check for duplicates
/// themselves; callers guard with [`SpecificationArchive::contains`] or
/// clear stale records first, per the store contract.
#[derive(Clone)]
pub struct SpecificationArchive {
    store: Arc<dyn ResultStore>,
}

impl SpecificationArchive {
    pub fn new(store: Arc<dyn ResultStore>) -> Self {
        Self { store }
    }

    const COLLECTION: &'static str = SpecificationsResponse::COLLECTION;

    pub async fn contains(&self, artifact_id: &ArtifactId) -> Result<bool, StoreError> {
        self.store.exists(Self::COLLECTION, artifact_id).await
    }

    /// Persist one request/response pair.
    pub async fn insert(
        &self,
        request: &SpecificationsRequest,
        response: &SpecificationsResponse,
    ) -> Result<(), StoreError> {
        let request_doc = serde_json::to_value(request)?;
        let response_doc = serde_json::to_value(response)?;
        self.store
            .insert_pair(
                Self::COLLECTION,
                &request.artifact.id,
                &request_doc,
                &response_doc,
            )
            .await?;
        info!(
            artifact = %request.artifact.id,
            specifications = response.specifications.len(),
            "Specifications stored in archive"
        );
        Ok(())
    }

    /// Remove the record for one artifact. Returns how many were removed.
    pub async fn remove(&self, artifact_id: &ArtifactId) -> Result<u64, StoreError> {
        self.store.delete_one(Self::COLLECTION, artifact_id).await
    }

    /// Remove every stored specification record.
    pub async fn clear(&self) -> Result<u64, StoreError> {
        self.store.delete_all(Self::COLLECTION).await
    }

    pub async fn read_response(
        &self,
        artifact_id: &ArtifactId,
    ) -> Result<Option<SpecificationsResponse>, StoreError> {
        Ok(self
            .read_run(artifact_id)
            .await?
            .map(|archived| archived.response))
    }

    pub async fn read_request(
        &self,
        artifact_id: &ArtifactId,
    ) -> Result<Option<SpecificationsRequest>, StoreError> {
        Ok(self
            .read_run(artifact_id)
            .await?
            .map(|archived| archived.request))
    }

    /// Read the full stored pair for one artifact.
    pub async fn read_run(
        &self,
        artifact_id: &ArtifactId,
    ) -> Result<Option<ArchivedRun>, StoreError> {
        match self.store.fetch(Self::COLLECTION, artifact_id).await? {
            Some(document) => Ok(Some(decode(document.into_pair()?)?)),
            None => Ok(None),
        }
    }

    /// Every stored pair, ordered by artifact id.
    pub async fn read_all(&self) -> Result<Vec<ArchivedRun>, StoreError> {
        let mut runs = Vec::new();
        for document in self.store.fetch_all(Self::COLLECTION).await? {
            runs.push(decode(document.into_pair()?)?);
        }
        Ok(runs)
    }
}

fn decode((request, response): (JsonValue, JsonValue)) -> Result<ArchivedRun, StoreError> {
    Ok(ArchivedRun {
        request: serde_json::from_value(request)?,
        response: serde_json::from_value(response)?,
    })
}
