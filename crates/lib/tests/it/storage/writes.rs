use weavestore::{NewObject, Timestamp, query::ObjectQuery};

use crate::helpers::{ids, put, test_storage_with_user};

#[tokio::test]
async fn test_upsert_by_id_replaces_fields() {
    let (storage, clock, alice) = test_storage_with_user("alice").await;
    let first = storage
        .insert(&alice, "c", NewObject::new("a", "one").with_sort_index(3).with_ttl(i64::MAX))
        .await
        .unwrap();
    clock.advance(5_000);
    let second = storage
        .insert(&alice, "c", NewObject::new("a", "two").with_predecessor("z"))
        .await
        .unwrap();

    assert_eq!(first.key, second.key);
    assert!(second.modified > first.modified);

    let all = storage
        .query(&alice, "c", &ObjectQuery::new(), storage.now())
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
    let stored = &all[0];
    assert_eq!(stored.payload, "two");
    assert_eq!(stored.predecessor_id.as_deref(), Some("z"));
    assert_eq!(stored.sort_index, None);
    assert_eq!(stored.ttl, None);
    assert_eq!(stored.modified, second.modified);
}

#[tokio::test]
async fn test_insert_creates_collection_lazily() {
    let (storage, _clock, alice) = test_storage_with_user("alice").await;
    assert!(storage.list_collections(&alice).await.unwrap().is_empty());
    put(&storage, &alice, "forms", NewObject::new("f", "")).await;
    let collections = storage.list_collections(&alice).await.unwrap();
    assert_eq!(collections.len(), 1);
    assert_eq!(collections[0].name, "forms");
}

#[tokio::test]
async fn test_delete_by_object_is_idempotent() {
    let (storage, _clock, alice) = test_storage_with_user("alice").await;
    let stored = storage
        .insert(&alice, "c", NewObject::new("a", ""))
        .await
        .unwrap();
    put(&storage, &alice, "c", NewObject::new("b", "")).await;

    storage.delete(&stored).await.unwrap();
    storage.delete(&stored).await.unwrap();
    storage.delete_object(stored.key).await.unwrap();

    let remaining = storage
        .query(&alice, "c", &ObjectQuery::new(), storage.now())
        .await
        .unwrap();
    assert_eq!(ids(&remaining), ["b"]);
}

#[tokio::test]
async fn test_delete_collection_then_aggregate_is_empty() {
    let (storage, _clock, alice) = test_storage_with_user("alice").await;
    put(&storage, &alice, "history", NewObject::new("h1", "x".repeat(4096))).await;
    put(&storage, &alice, "history", NewObject::new("h2", "")).await;

    storage.delete_collection(&alice, "history").await.unwrap();

    let stats = storage
        .aggregate(&alice, "history", storage.now())
        .await
        .unwrap();
    assert_eq!(stats.count, 0);
    assert_eq!(stats.size_kib, 0);
    assert_eq!(stats.last_modified, Timestamp::ZERO);
    assert!(storage.find_collection(&alice, "history").await.unwrap().is_none());

    // The name is reusable and starts empty
    put(&storage, &alice, "history", NewObject::new("h3", "")).await;
    let stats = storage
        .aggregate(&alice, "history", storage.now())
        .await
        .unwrap();
    assert_eq!(stats.count, 1);
}

#[tokio::test]
async fn test_delete_all_collections_keeps_user_and_others() {
    let (storage, _clock, alice) = test_storage_with_user("alice").await;
    let bob = storage
        .create_user(weavestore::NewUser::new("bob", "pw", ""))
        .await
        .unwrap();
    for name in ["bookmarks", "tabs", "prefs"] {
        put(&storage, &alice, name, NewObject::new("x", "")).await;
    }
    put(&storage, &bob, "tabs", NewObject::new("x", "")).await;

    storage.delete_all_collections(&alice).await.unwrap();

    assert!(storage.list_collections(&alice).await.unwrap().is_empty());
    assert!(storage.find_user("alice").await.unwrap().is_some());
    let now = storage.now();
    assert!(storage.get_object(&bob, "tabs", "x", now).await.unwrap().is_some());
    assert_eq!(storage.total_size(&alice, now).await.unwrap(), 0);
}

#[tokio::test]
async fn test_summaries_and_total_size() {
    let (storage, _clock, alice) = test_storage_with_user("alice").await;
    put(&storage, &alice, "tabs", NewObject::new("1", "x".repeat(3000))).await;
    put(&storage, &alice, "bookmarks", NewObject::new("1", "x".repeat(1024))).await;
    put(&storage, &alice, "bookmarks", NewObject::new("2", "x".repeat(1024))).await;

    let now = storage.now();
    let summaries = storage.collection_summaries(&alice, now).await.unwrap();
    let names: Vec<&str> = summaries.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["bookmarks", "tabs"]);
    assert_eq!(summaries[0].stats.count, 2);
    assert_eq!(summaries[0].stats.size_kib, 2);
    assert_eq!(summaries[1].stats.size_kib, 2);

    // 5048 bytes overall
    assert_eq!(storage.total_size(&alice, now).await.unwrap(), 4);
}
