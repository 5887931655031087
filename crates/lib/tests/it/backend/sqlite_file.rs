//! File-backed SQLite: durability across reopen and real write contention.

use std::sync::Arc;

use tempfile::TempDir;

use weavestore::{
    NewObject, NewUser, Storage, Timestamp,
    backend::{BackendImpl, database::SqlxBackend},
};

#[tokio::test]
async fn test_data_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("weave.db");
    let now = Timestamp::from_secs(1_000);

    {
        let backend = SqlxBackend::open_sqlite(&path).await.unwrap();
        let alice = backend
            .create_user(NewUser::new("alice", "pw", ""))
            .await
            .unwrap();
        backend
            .put_object(alice.id, "bookmarks", NewObject::new("b1", "{\"u\":1}"), now)
            .await
            .unwrap();
        backend.close().await;
    }

    let backend = SqlxBackend::open_sqlite(&path).await.unwrap();
    let alice = backend.find_user("alice").await.unwrap().unwrap();
    let object = backend
        .get_object(alice.id, "bookmarks", "b1", now)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(object.payload, "{\"u\":1}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_resolution_converges() {
    let dir = TempDir::new().unwrap();
    let backend = SqlxBackend::open_sqlite(dir.path().join("race.db"))
        .await
        .unwrap();
    let storage = Storage::open(Box::new(backend));
    let alice = Arc::new(
        storage
            .create_user(NewUser::new("alice", "pw", ""))
            .await
            .unwrap(),
    );

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let storage = storage.clone();
            let alice = Arc::clone(&alice);
            tokio::spawn(async move {
                storage
                    .insert(&alice, "tabs", NewObject::new(format!("t{i}"), ""))
                    .await
                    .unwrap()
                    .collection
            })
        })
        .collect();

    let mut collections = Vec::new();
    for task in tasks {
        collections.push(task.await.unwrap());
    }
    collections.dedup();
    assert_eq!(collections.len(), 1);

    let listed = storage.list_collections(&alice).await.unwrap();
    assert_eq!(listed.len(), 1);
    let stats = storage.aggregate(&alice, "tabs", storage.now()).await.unwrap();
    assert_eq!(stats.count, 8);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_resolution_survives_concurrent_deletes() {
    let dir = TempDir::new().unwrap();
    let backend = Arc::new(
        SqlxBackend::open_sqlite(dir.path().join("churn.db"))
            .await
            .unwrap(),
    );
    let alice = backend
        .create_user(NewUser::new("alice", "pw", ""))
        .await
        .unwrap()
        .id;

    let resolvers = (0..4).map(|_| {
        let backend = Arc::clone(&backend);
        tokio::spawn(async move {
            for _ in 0..25 {
                let collection = backend.resolve_collection(alice, "tabs").await?;
                assert_eq!(collection.user, alice);
            }
            Ok::<_, weavestore::Error>(())
        })
    });
    let deleters = (0..2).map(|_| {
        let backend = Arc::clone(&backend);
        tokio::spawn(async move {
            for _ in 0..25 {
                backend.delete_collection_by_name(alice, "tabs").await?;
            }
            Ok::<_, weavestore::Error>(())
        })
    });

    let tasks: Vec<_> = resolvers.chain(deleters).collect();
    for task in tasks {
        if let Err(err) = task.await.unwrap() {
            assert!(!err.is_integrity_error(), "resolve raced a delete: {err}");
            panic!("unexpected error: {err}");
        }
    }
}
