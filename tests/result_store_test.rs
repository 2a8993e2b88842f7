use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use errspec::adapters::sqlite::{create_pool, create_test_pool};
use errspec::adapters::{MockBehavior, MockOperationClient, SqliteResultStore};
use errspec::application::{
    AnalysisRunner, OperationScheduler, RetryPolicy, SpecificationArchive,
};
use errspec::domain::models::lattice::SignLatticeElement;
use errspec::domain::models::specification::{
    ArtifactHandle, ArtifactId, FunctionRef, Specification, SpecificationsRequest,
    SpecificationsResponse,
};
use errspec::domain::ports::{ResultStore, StoreError};

const COLLECTION: &str = SpecificationsResponse::COLLECTION;

async fn setup_store() -> SqliteResultStore {
    let pool = create_test_pool()
        .await
        .expect("failed to create test database");
    SqliteResultStore::new(pool)
}

fn sample_request(id: &str) -> SpecificationsRequest {
    SpecificationsRequest::new(ArtifactHandle {
        id: ArtifactId::new(id),
        uri: format!("file:///corpus/{id}.bc"),
        authority: Some("localhost:50051".to_string()),
    })
}

fn sample_response() -> SpecificationsResponse {
    SpecificationsResponse {
        specifications: vec![Specification {
            function: FunctionRef::from_source_name("mbedtls_md_setup"),
            lattice_element: SignLatticeElement::LessThanZero,
            confidence: SignLatticeElement::LessThanZero.canonical_confidence(),
        }],
    }
}

#[tokio::test]
async fn test_exists_tracks_insert_and_delete_all() {
    let store = setup_store().await;
    let artifact_id = ArtifactId::new("artifact-a");

    assert!(!store.exists(COLLECTION, &artifact_id).await.unwrap());

    store
        .insert_pair(
            COLLECTION,
            &artifact_id,
            &json!({"artifact": {"id": "artifact-a"}}),
            &json!({"specifications": []}),
        )
        .await
        .expect("insert must succeed");

    assert!(store.exists(COLLECTION, &artifact_id).await.unwrap());

    let removed = store.delete_all(COLLECTION).await.unwrap();
    assert_eq!(removed, 1);
    assert!(!store.exists(COLLECTION, &artifact_id).await.unwrap());
}

#[tokio::test]
async fn test_insert_merges_request_under_reserved_field() {
    let store = setup_store().await;
    let artifact_id = ArtifactId::new("artifact-b");

    store
        .insert_pair(
            COLLECTION,
            &artifact_id,
            &json!({"artifact": {"id": "artifact-b", "uri": "file:///b.bc"}}),
            &json!({"specifications": [{"name": "free"}]}),
        )
        .await
        .unwrap();

    let document = store
        .fetch(COLLECTION, &artifact_id)
        .await
        .unwrap()
        .expect("record must exist");

    assert_eq!(document.artifact_id, artifact_id);
    assert_eq!(document.document["request"]["artifact"]["id"], "artifact-b");
    assert_eq!(document.document["specifications"][0]["name"], "free");
}

#[tokio::test]
async fn test_response_with_reserved_field_is_rejected() {
    let store = setup_store().await;
    let artifact_id = ArtifactId::new("artifact-c");

    let result = store
        .insert_pair(
            COLLECTION,
            &artifact_id,
            &json!({}),
            &json!({"request": "already here"}),
        )
        .await;

    assert!(matches!(result, Err(StoreError::ReservedField)));
    assert!(!store.exists(COLLECTION, &artifact_id).await.unwrap());
}

#[tokio::test]
async fn test_duplicate_insert_is_rejected() {
    let store = setup_store().await;
    let artifact_id = ArtifactId::new("artifact-d");
    let request = json!({"artifact": {"id": "artifact-d"}});
    let response = json!({"specifications": []});

    store
        .insert_pair(COLLECTION, &artifact_id, &request, &response)
        .await
        .unwrap();

    let result = store
        .insert_pair(COLLECTION, &artifact_id, &request, &response)
        .await;

    match result {
        Err(StoreError::Duplicate {
            collection,
            artifact_id: dup_id,
        }) => {
            assert_eq!(collection, COLLECTION);
            assert_eq!(dup_id, artifact_id);
        }
        other => panic!("expected duplicate error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_delete_one_leaves_other_records_alone() {
    let store = setup_store().await;
    let keep = ArtifactId::new("artifact-keep");
    let target = ArtifactId::new("artifact-drop");
    for artifact_id in [&keep, &target] {
        store
            .insert_pair(COLLECTION, artifact_id, &json!({}), &json!({"specifications": []}))
            .await
            .unwrap();
    }

    let removed = store.delete_one(COLLECTION, &target).await.unwrap();
    assert_eq!(removed, 1);
    assert!(store.exists(COLLECTION, &keep).await.unwrap());
    assert!(!store.exists(COLLECTION, &target).await.unwrap());

    // Deleting again is a no-op.
    assert_eq!(store.delete_one(COLLECTION, &target).await.unwrap(), 0);
}

#[tokio::test]
async fn test_fetch_all_is_ordered_by_artifact_id() {
    let store = setup_store().await;
    for id in ["zz-last", "aa-first", "mm-middle"] {
        store
            .insert_pair(
                COLLECTION,
                &ArtifactId::new(id),
                &json!({}),
                &json!({"specifications": []}),
            )
            .await
            .unwrap();
    }

    let documents = store.fetch_all(COLLECTION).await.unwrap();
    let ids: Vec<&str> = documents
        .iter()
        .map(|document| document.artifact_id.as_str())
        .collect();
    assert_eq!(ids, vec!["aa-first", "mm-middle", "zz-last"]);
}

#[tokio::test]
async fn test_on_disk_store_persists_across_pools() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    // Nested path: the pool must create the parent directory itself.
    let database_url = format!(
        "sqlite://{}/nested/errspec.db",
        dir.path().display()
    );

    let artifact_id = ArtifactId::new("artifact-disk");
    {
        let pool = create_pool(&database_url, None)
            .await
            .expect("failed to open on-disk store");
        let store = SqliteResultStore::new(pool);
        store
            .insert_pair(
                COLLECTION,
                &artifact_id,
                &json!({}),
                &json!({"specifications": []}),
            )
            .await
            .unwrap();
    }

    let pool = create_pool(&database_url, None)
        .await
        .expect("failed to reopen on-disk store");
    let store = SqliteResultStore::new(pool);
    assert!(store.exists(COLLECTION, &artifact_id).await.unwrap());
}

#[tokio::test]
async fn test_archive_round_trips_typed_pairs() {
    let store = setup_store().await;
    let archive = SpecificationArchive::new(Arc::new(store));

    let request = sample_request("artifact-e");
    let response = sample_response();

    assert!(!archive.contains(&request.artifact.id).await.unwrap());
    archive.insert(&request, &response).await.unwrap();
    assert!(archive.contains(&request.artifact.id).await.unwrap());

    let read_response = archive
        .read_response(&request.artifact.id)
        .await
        .unwrap()
        .expect("response must round-trip");
    assert_eq!(read_response, response);

    let read_request = archive
        .read_request(&request.artifact.id)
        .await
        .unwrap()
        .expect("request must round-trip");
    assert_eq!(read_request, request);

    let all = archive.read_all().await.unwrap();
    assert_eq!(all.len(), 1);
}

fn fast_runner(
    client: &Arc<MockOperationClient>,
    archive: SpecificationArchive,
) -> AnalysisRunner<MockOperationClient> {
    let scheduler = OperationScheduler::new(Arc::clone(client))
        .with_retry_policy(RetryPolicy::new(Duration::from_millis(1), None))
        .with_idle_backoff(Duration::from_millis(1));
    AnalysisRunner::new(scheduler, archive, 2)
}

#[tokio::test]
async fn test_runner_skips_archived_artifacts_and_flags_partial_completion() {
    let store = setup_store().await;
    let archive = SpecificationArchive::new(Arc::new(store));

    // One artifact already has results.
    let archived = sample_request("artifact-old");
    archive.insert(&archived, &sample_response()).await.unwrap();

    let client = Arc::new(MockOperationClient::new());
    let runner = fast_runner(&client, archive.clone());

    let outcome = runner
        .run(vec![archived.clone(), sample_request("artifact-new")], false)
        .await
        .expect("run must complete");

    assert!(outcome.changed);
    assert!(outcome.partial_completion);
    assert_eq!(outcome.skipped, 1);
    assert_eq!(outcome.completed, 1);
    // The archived artifact never reached the service.
    assert_eq!(client.submit_calls(), 1);
    assert!(archive
        .contains(&ArtifactId::new("artifact-new"))
        .await
        .unwrap());
}

#[tokio::test]
async fn test_runner_overwrite_replaces_stale_record() {
    let store = setup_store().await;
    let archive = SpecificationArchive::new(Arc::new(store));

    let request = sample_request("artifact-f");
    archive.insert(&request, &sample_response()).await.unwrap();

    // The rerun produces a different specification set.
    let fresh = SpecificationsResponse {
        specifications: vec![Specification {
            function: FunctionRef::from_source_name("gnutls_handshake"),
            lattice_element: SignLatticeElement::Zero,
            confidence: SignLatticeElement::Zero.canonical_confidence(),
        }],
    };
    let client = Arc::new(MockOperationClient::new());
    client
        .set_behavior(
            request.artifact.id.clone(),
            MockBehavior::done_after(1).with_response(serde_json::to_value(&fresh).unwrap()),
        )
        .await;

    let runner = fast_runner(&client, archive.clone());
    let outcome = runner
        .run(vec![request.clone()], true)
        .await
        .expect("overwrite run must complete");

    assert!(outcome.changed);
    assert!(!outcome.partial_completion);

    let stored = archive
        .read_response(&request.artifact.id)
        .await
        .unwrap()
        .expect("record must exist");
    assert_eq!(stored, fresh);
}
