//! SQLite implementation of the ResultStore.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::SqlitePool;

use crate::domain::models::specification::ArtifactId;
use crate::domain::ports::{merge_pair, ResultStore, StoreError, StoredDocument};

/// Document store over a single `records` table.
///
/// Whole documents are stored as JSON text; point lookups go through the
/// unique `(collection, artifact_id)` index rather than field paths into
/// the document body.
#[derive(Clone)]
pub struct SqliteResultStore {
    pool: SqlitePool,
}

impl SqliteResultStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct RecordRow {
    collection: String,
    artifact_id: String,
    document: String,
    stored_at: String,
}

impl TryFrom<RecordRow> for StoredDocument {
    type Error = StoreError;

    fn try_from(row: RecordRow) -> Result<Self, Self::Error> {
        let document: JsonValue = serde_json::from_str(&row.document)?;
        let stored_at = row
            .stored_at
            .parse::<DateTime<Utc>>()
            .unwrap_or_else(|_| Utc::now());
        Ok(Self {
            collection: row.collection,
            artifact_id: ArtifactId::new(row.artifact_id),
            document,
            stored_at,
        })
    }
}

#[async_trait]
impl ResultStore for SqliteResultStore {
    async fn exists(
        &self,
        collection: &str,
        artifact_id: &ArtifactId,
    ) -> Result<bool, StoreError> {
        let found: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM records WHERE collection = ? AND artifact_id = ? LIMIT 1",
        )
        .bind(collection)
        .bind(artifact_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(found.is_some())
    }

    async fn insert_pair(
        &self,
        collection: &str,
        artifact_id: &ArtifactId,
        request: &JsonValue,
        response: &JsonValue,
    ) -> Result<(), StoreError> {
        let document = merge_pair(request, response)?;
        let body = serde_json::to_string(&document)?;

        let result = sqlx::query(
            "INSERT INTO records (collection, artifact_id, document, stored_at)
               VALUES (?, ?, ?, ?)",
        )
        .bind(collection)
        .bind(artifact_id.as_str())
        .bind(&body)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StoreError::Duplicate {
                    collection: collection.to_string(),
                    artifact_id: artifact_id.clone(),
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn delete_one(
        &self,
        collection: &str,
        artifact_id: &ArtifactId,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM records WHERE collection = ? AND artifact_id = ?")
            .bind(collection)
            .bind(artifact_id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_all(&self, collection: &str) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM records WHERE collection = ?")
            .bind(collection)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn fetch(
        &self,
        collection: &str,
        artifact_id: &ArtifactId,
    ) -> Result<Option<StoredDocument>, StoreError> {
        let row: Option<RecordRow> = sqlx::query_as(
            "SELECT collection, artifact_id, document, stored_at
               FROM records WHERE collection = ? AND artifact_id = ?",
        )
        .bind(collection)
        .bind(artifact_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(StoredDocument::try_from).transpose()
    }

    async fn fetch_all(&self, collection: &str) -> Result<Vec<StoredDocument>, StoreError> {
        let rows: Vec<RecordRow> = sqlx::query_as(
            "SELECT collection, artifact_id, document, stored_at
               FROM records WHERE collection = ? ORDER BY artifact_id",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(StoredDocument::try_from).collect()
    }
}
