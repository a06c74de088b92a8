mod common;

use common::FaultyStore;
use firestore_tree::artifact::parse_database;
use firestore_tree::model::fields;
use firestore_tree::{
    BackupError, CollectionTree, DatabaseArtifact, DocumentNode, ExportOptions, Exporter, Fields,
    InMemoryStore, RestoreOptions, Restorer, StoreError, restore_database,
};
use serde_json::json;

fn users_store() -> InMemoryStore {
    let mut store = InMemoryStore::new("demo");
    store.set_document("users/u1", fields([("name", "Ann")])).unwrap();
    store.set_document("users/u2", Fields::new()).unwrap();
    store
        .set_document("users/u2/orders/o1", fields([("total", 9_i64)]))
        .unwrap();
    store
}

fn flat_collection(name: &str, count: usize) -> DatabaseArtifact {
    let mut tree = CollectionTree::new();
    for i in 0..count {
        let node = DocumentNode {
            id: format!("d{i:04}"),
            data: json!({"n": i}),
            ..DocumentNode::default()
        };
        tree.insert_document(format!("d{i:04}"), node).unwrap();
    }
    DatabaseArtifact {
        metadata: None,
        collections: [(name.to_string(), tree)].into_iter().collect(),
    }
}

#[test]
fn test_export_users_scenario() {
    let store = users_store();
    let export = Exporter::new(&store)
        .export_database(ExportOptions::default())
        .unwrap();
    let json = serde_json::to_value(&export.artifact).unwrap();

    assert_eq!(json["collections"]["users"]["u1"]["data"], json!({"name": "Ann"}));
    assert_eq!(json["collections"]["users"]["u1"]["subcollections"], json!({}));
    assert_eq!(json["collections"]["users"]["u2"]["data"], json!({}));
    assert_eq!(
        json["collections"]["users"]["u2"]["subcollections"]["orders"]["o1"]["id"],
        json!("o1")
    );
    assert_eq!(json["metadata"]["total_collections"], json!(1));
    assert_eq!(json["metadata"]["total_documents"], json!(2));
}

#[test]
fn test_restore_users_scenario() {
    let store = users_store();
    let artifact = Exporter::new(&store)
        .export_database(ExportOptions::default())
        .unwrap()
        .artifact;

    // Dry run: counts only, no commit attempted.
    let mut target = FaultyStore::new(InMemoryStore::new("demo"));
    let dry = RestoreOptions {
        dry_run: true,
        ..RestoreOptions::default()
    };
    let report = restore_database(&mut target, &artifact, &dry).unwrap();
    assert_eq!(report.collections.get("users"), Some(&2));
    assert_eq!(target.commit_attempts, 0);

    // Live: the nested batch commits first, then the parent batch.
    let report = restore_database(&mut target, &artifact, &RestoreOptions::default()).unwrap();
    assert_eq!(report.collections.len(), 1);
    assert_eq!(report.collections.get("users"), Some(&2));
    assert_eq!(
        target.committed,
        vec![
            vec!["users/u2/orders/o1".to_string()],
            vec!["users/u1".to_string(), "users/u2".to_string()],
        ]
    );
}

#[test]
fn test_batch_of_exactly_batch_size_commits_once() {
    let artifact = flat_collection("items", 500);
    let mut target = FaultyStore::new(InMemoryStore::new("demo"));
    let report = restore_database(&mut target, &artifact, &RestoreOptions::default()).unwrap();

    assert_eq!(report.collections["items"], 500);
    assert_eq!(target.commit_attempts, 1);
    assert_eq!(target.committed[0].len(), 500);
}

#[test]
fn test_batch_boundaries() {
    let artifact = flat_collection("items", 501);
    let mut target = FaultyStore::new(InMemoryStore::new("demo"));
    restore_database(&mut target, &artifact, &RestoreOptions::default()).unwrap();
    let sizes: Vec<_> = target.committed.iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![500, 1]);

    let artifact = flat_collection("items", 5);
    let mut target = FaultyStore::new(InMemoryStore::new("demo"));
    let options = RestoreOptions {
        batch_size: 2,
        ..RestoreOptions::default()
    };
    let report = restore_database(&mut target, &artifact, &options).unwrap();
    let sizes: Vec<_> = target.committed.iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![2, 2, 1]);
    assert_eq!(report.commits, 3);
}

#[test]
fn test_error_marker_is_never_a_document() {
    let artifact = parse_database(
        &json!({
            "collections": {
                "users": {
                    "a": {"data": {}},
                    "b": {"data": {}},
                    "c": {"data": {}},
                    "_error": "deadline exceeded"
                }
            }
        })
        .to_string(),
    )
    .unwrap();

    let dry = RestoreOptions {
        dry_run: true,
        ..RestoreOptions::default()
    };
    let mut target = FaultyStore::new(InMemoryStore::new("demo"));
    assert_eq!(
        restore_database(&mut target, &artifact, &dry).unwrap().collections["users"],
        3
    );

    let report = restore_database(&mut target, &artifact, &RestoreOptions::default()).unwrap();
    assert_eq!(report.collections["users"], 3);
    assert!(target.written_paths().iter().all(|p| !p.contains("_error")));
    assert_eq!(target.written_paths().len(), 3);
}

#[test]
fn test_stream_failure_is_isolated_to_its_collection() {
    let mut inner = users_store();
    inner.set_document("users/u3", fields([("name", "Cy")])).unwrap();
    inner.set_document("teams/t1", fields([("size", 4_i64)])).unwrap();

    let mut store = FaultyStore::new(inner);
    store.fail_stream_after.insert("users".to_string(), 1);

    let export = Exporter::new(&store)
        .export_database(ExportOptions::default())
        .unwrap();

    let users = &export.artifact.collections["users"];
    assert_eq!(users.document_count(), 1);
    assert!(users.document("u1").is_some());
    assert!(users.error().unwrap().contains("stream reset by peer"));

    let teams = &export.artifact.collections["teams"];
    assert_eq!(teams.document_count(), 1);
    assert!(teams.error().is_none());

    assert_eq!(export.summary.failed_collections, vec!["users".to_string()]);
    assert_eq!(export.artifact.metadata.unwrap().total_documents, 2);
}

#[test]
fn test_nested_failure_stays_nested() {
    let mut store = FaultyStore::new(users_store());
    store
        .fail_stream_after
        .insert("users/u2/orders".to_string(), 0);

    let export = Exporter::new(&store).export_collection("users");
    assert!(!export.is_partial());

    let users = export.into_tree();
    assert_eq!(users.document_count(), 2);
    let orders = &users.document("u2").unwrap().subcollections["orders"];
    assert_eq!(orders.document_count(), 0);
    assert!(orders.error().is_some());
    assert_eq!(users.error_paths("users"), vec!["users/u2/orders".to_string()]);
}

#[test]
fn test_subcollection_listing_failure_marks_parent_collection() {
    let mut store = FaultyStore::new(users_store());
    store.fail_subcollections.insert("users/u2".to_string());

    let export = Exporter::new(&store).export_collection("users");
    assert!(export.is_partial());
    assert!(matches!(
        export.error(),
        Some(StoreError::ListSubcollections { .. })
    ));
    // u1 was complete before the failure; u2 is dropped.
    let users = export.into_tree();
    assert!(users.document("u1").is_some());
    assert!(users.document("u2").is_none());
    assert!(users.error().is_some());
}

#[test]
fn test_commit_failure_aborts_but_keeps_committed_batches() {
    let artifact = flat_collection("items", 5);
    let mut target = FaultyStore::new(InMemoryStore::new("demo"));
    target.fail_commit_at = Some(1);

    let mut restorer = Restorer::new(&mut target, 2).unwrap();
    let err = restorer
        .restore_collection(&artifact.collections["items"], "items")
        .unwrap_err();
    match err {
        BackupError::CommitAborted {
            collection, queued, ..
        } => {
            assert_eq!(collection, "items");
            assert_eq!(queued, 4);
        }
        other => panic!("expected CommitAborted, got {other:?}"),
    }

    assert_eq!(target.commit_attempts, 2);
    assert_eq!(target.inner.document_count(), 2);
}

#[test]
fn test_export_restore_export_preserves_non_timestamp_data() {
    let mut source = users_store();
    source
        .set_document(
            "places/p1",
            fields([
                ("tags", firestore_tree::Value::from(vec!["a", "b"])),
                (
                    "home",
                    firestore_tree::Value::GeoPoint(
                        firestore_tree::GeoPoint::new(10.0, 20.0).unwrap(),
                    ),
                ),
                (
                    "owner",
                    firestore_tree::Value::Reference(
                        firestore_tree::DocumentReference::parse("users/u1").unwrap(),
                    ),
                ),
            ]),
        )
        .unwrap();

    let first = Exporter::new(&source)
        .export_database(ExportOptions::default())
        .unwrap()
        .artifact;

    let mut target = InMemoryStore::new("demo");
    restore_database(&mut target, &first, &RestoreOptions::default()).unwrap();

    let second = Exporter::new(&target)
        .export_database(ExportOptions::default())
        .unwrap()
        .artifact;

    for (name, tree) in &first.collections {
        for (id, node) in tree.documents() {
            let again = second.collections[name].document(id).unwrap();
            assert_eq!(node.data, again.data, "{name}/{id}");
        }
    }
    assert_eq!(
        first.collections["users"].nested_document_count(),
        second.collections["users"].nested_document_count()
    );
}
