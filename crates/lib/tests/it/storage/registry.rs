use weavestore::NewObject;

use crate::helpers::{put, test_storage_with_user};

#[tokio::test]
async fn test_resolve_twice_returns_same_collection() {
    let (storage, _clock, alice) = test_storage_with_user("alice").await;
    let first = storage.resolve_collection(&alice, "bookmarks").await.unwrap();
    let second = storage.resolve_collection(&alice, "bookmarks").await.unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(first.user, alice.id);
}

#[tokio::test]
async fn test_concurrent_resolve_converges() {
    let (storage, _clock, alice) = test_storage_with_user("alice").await;
    let (a, b, c) = tokio::join!(
        storage.resolve_collection(&alice, "tabs"),
        storage.resolve_collection(&alice, "tabs"),
        storage.resolve_collection(&alice, "tabs"),
    );
    let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());
    assert_eq!(a.id, b.id);
    assert_eq!(b.id, c.id);
    assert_eq!(storage.list_collections(&alice).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_empty_collection_name_is_rejected() {
    let (storage, _clock, alice) = test_storage_with_user("alice").await;
    let err = storage.resolve_collection(&alice, "").await.unwrap_err();
    assert!(err.is_validation_error());
}

#[tokio::test]
async fn test_collections_are_per_user() {
    let (storage, _clock, alice) = test_storage_with_user("alice").await;
    let bob = storage
        .create_user(weavestore::NewUser::new("bob", "pw", ""))
        .await
        .unwrap();

    put(&storage, &alice, "prefs", NewObject::new("theme", "dark")).await;
    put(&storage, &bob, "prefs", NewObject::new("theme", "light")).await;

    let now = storage.now();
    let mine = storage.get_object(&alice, "prefs", "theme", now).await.unwrap().unwrap();
    let theirs = storage.get_object(&bob, "prefs", "theme", now).await.unwrap().unwrap();
    assert_eq!(mine.payload, "dark");
    assert_eq!(theirs.payload, "light");
    assert_ne!(mine.collection, theirs.collection);
    assert_ne!(mine, theirs);
}

#[tokio::test]
async fn test_find_does_not_create() {
    let (storage, _clock, alice) = test_storage_with_user("alice").await;
    assert!(storage.find_collection(&alice, "tabs").await.unwrap().is_none());
    assert!(storage.list_collections(&alice).await.unwrap().is_empty());

    // Reads against a missing collection are empty, not errors
    let now = storage.now();
    assert!(storage.get_object(&alice, "tabs", "x", now).await.unwrap().is_none());
    let stats = storage.aggregate(&alice, "tabs", now).await.unwrap();
    assert_eq!(stats.count, 0);
    assert!(stats.last_modified.is_zero());
    assert!(storage.find_collection(&alice, "tabs").await.unwrap().is_none());
}
