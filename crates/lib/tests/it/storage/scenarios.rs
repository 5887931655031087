//! End-to-end scenarios for the engine's observable guarantees.

use weavestore::{
    NewObject, Timestamp,
    query::{ObjectQuery, SortOrder},
};

use crate::helpers::{ids, put, test_storage_with_user};

#[tokio::test]
async fn test_newest_and_index_orders_disagree() {
    let (storage, clock, alice) = test_storage_with_user("alice").await;
    clock.set_secs(1_000);
    put(&storage, &alice, "c", NewObject::new("a", "").with_sort_index(10)).await;
    clock.set_secs(2_000);
    put(&storage, &alice, "c", NewObject::new("b", "").with_sort_index(5)).await;

    let now = storage.now();
    let newest = storage
        .query(&alice, "c", &ObjectQuery::new().sort(SortOrder::Newest), now)
        .await
        .unwrap();
    assert_eq!(ids(&newest), ["b", "a"]);

    let index = storage
        .query(&alice, "c", &ObjectQuery::new().sort(SortOrder::Index), now)
        .await
        .unwrap();
    assert_eq!(ids(&index), ["a", "b"]);
}

#[tokio::test]
async fn test_oldest_second_page_of_one() {
    let (storage, clock, alice) = test_storage_with_user("alice").await;
    // Insert out of chronological order so key order and time order differ
    for (id, secs) in [("t300", 300), ("t100", 100), ("t200", 200)] {
        clock.set_secs(secs);
        put(&storage, &alice, "c", NewObject::new(id, "")).await;
    }

    let query = ObjectQuery::new().sort(SortOrder::Oldest).limit(1).offset(1);
    let page = storage
        .query(&alice, "c", &query, Timestamp::from_secs(400))
        .await
        .unwrap();
    assert_eq!(ids(&page), ["t200"]);
    assert_eq!(page[0].modified, Timestamp::from_secs(200));
}

#[tokio::test]
async fn test_expired_objects_are_never_seen() {
    let (storage, clock, alice) = test_storage_with_user("alice").await;
    clock.set_secs(1_000);
    put(&storage, &alice, "c", NewObject::new("short", "abc").with_ttl(1_010)).await;
    put(&storage, &alice, "c", NewObject::new("long", "de").with_ttl(5_000)).await;

    // Before expiry both are visible
    let before = Timestamp::from_secs(1_005);
    let stats = storage.aggregate(&alice, "c", before).await.unwrap();
    assert_eq!(stats.count, 2);

    let after = Timestamp::from_secs(1_011);
    assert!(storage.get_object(&alice, "c", "short", after).await.unwrap().is_none());
    let visible = storage
        .query(&alice, "c", &ObjectQuery::new().sort(SortOrder::Newest), after)
        .await
        .unwrap();
    assert_eq!(ids(&visible), ["long"]);
    let stats = storage.aggregate(&alice, "c", after).await.unwrap();
    assert_eq!(stats.count, 1);
    assert_eq!(storage.collection_summaries(&alice, after).await.unwrap()[0].stats.count, 1);

    // A request pinned to an earlier instant still sees it: as_of decides, not wall time
    assert!(storage.get_object(&alice, "c", "short", before).await.unwrap().is_some());
}

#[tokio::test]
async fn test_rewrite_revives_expired_object() {
    let (storage, clock, alice) = test_storage_with_user("alice").await;
    clock.set_secs(1_000);
    put(&storage, &alice, "c", NewObject::new("x", "old").with_ttl(1_001)).await;
    clock.set_secs(2_000);
    assert!(
        storage
            .get_object(&alice, "c", "x", storage.now())
            .await
            .unwrap()
            .is_none()
    );

    put(&storage, &alice, "c", NewObject::new("x", "new")).await;
    let object = storage
        .get_object(&alice, "c", "x", storage.now())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(object.payload, "new");
    assert_eq!(object.ttl, None);
}
