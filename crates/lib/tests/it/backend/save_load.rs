use std::fs;

use tempfile::TempDir;

use weavestore::{
    NewObject, NewUser, Timestamp,
    backend::{BackendImpl, database::InMemory},
    query::ObjectQuery,
};

#[tokio::test]
async fn test_in_memory_backend_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("weave.json");
    let now = Timestamp::from_secs(1_000);

    let saved_key = {
        let backend = InMemory::new();
        let alice = backend
            .create_user(NewUser::new("alice", "pw", "a@example.com"))
            .await
            .unwrap();
        backend
            .put_object(alice.id, "tabs", NewObject::new("t1", "{}").with_ttl(5_000), now)
            .await
            .unwrap();
        let stored = backend
            .put_object(alice.id, "tabs", NewObject::new("t2", "{}"), now)
            .await
            .unwrap();
        backend.save_to_file(&path).await.unwrap();
        stored.key
    };

    assert!(path.exists());

    let loaded = InMemory::load_from_file(&path).await.unwrap();
    let alice = loaded.find_user("alice").await.unwrap().unwrap();
    let objects = loaded
        .query_objects(alice.id, "tabs", &ObjectQuery::new(), now)
        .await
        .unwrap();
    assert_eq!(objects.len(), 2);
    assert_eq!(objects[0].ttl, Some(5_000));
    assert_eq!(objects[1].key, saved_key);

    // New rows continue after the saved identifiers
    let fresh = loaded
        .put_object(alice.id, "tabs", NewObject::new("t3", ""), now)
        .await
        .unwrap();
    assert!(fresh.key > saved_key);
}

#[tokio::test]
async fn test_load_non_existent_file() {
    let dir = TempDir::new().unwrap();
    let backend = InMemory::load_from_file(dir.path().join("missing.json"))
        .await
        .unwrap();
    assert!(backend.list_users().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_load_invalid_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("invalid.json");
    fs::write(&path, "{ not json").unwrap();

    let err = InMemory::load_from_file(&path).await.unwrap_err();
    assert!(err.is_io_error());
}

#[tokio::test]
async fn test_load_rejects_future_format_version() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("future.json");
    fs::write(
        &path,
        r#"{"_v": 9, "users": [], "collections": [], "objects": []}"#,
    )
    .unwrap();

    assert!(InMemory::load_from_file(&path).await.is_err());
}
