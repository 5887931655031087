use weavestore::{
    NewObject, Timestamp,
    query::{ObjectQuery, SortOrder},
};

use crate::helpers::{ids, put, test_storage_with_user};

#[tokio::test]
async fn test_id_set_semantics() {
    let (storage, _clock, alice) = test_storage_with_user("alice").await;
    for id in ["a", "b", "c"] {
        put(&storage, &alice, "c", NewObject::new(id, "")).await;
    }
    let now = storage.now();

    let empty = storage
        .query(&alice, "c", &ObjectQuery::new().ids(Vec::<String>::new()), now)
        .await
        .unwrap();
    assert!(empty.is_empty());

    let all = storage
        .query(&alice, "c", &ObjectQuery::new(), now)
        .await
        .unwrap();
    assert_eq!(ids(&all), ["a", "b", "c"]);

    let some = storage
        .query(&alice, "c", &ObjectQuery::new().ids(["b", "zzz"]), now)
        .await
        .unwrap();
    assert_eq!(ids(&some), ["b"]);
}

#[tokio::test]
async fn test_modified_window_uses_clock_stamps() {
    let (storage, clock, alice) = test_storage_with_user("alice").await;
    clock.set_secs(100);
    put(&storage, &alice, "c", NewObject::new("early", "")).await;
    clock.set_secs(200);
    put(&storage, &alice, "c", NewObject::new("middle", "")).await;
    clock.set_secs(300);
    put(&storage, &alice, "c", NewObject::new("late", "")).await;

    let now = storage.now();
    let since = storage
        .query(
            &alice,
            "c",
            &ObjectQuery::new().modified_since(Timestamp::from_secs(200)),
            now,
        )
        .await
        .unwrap();
    assert_eq!(ids(&since), ["middle", "late"]);

    let before = storage
        .query(
            &alice,
            "c",
            &ObjectQuery::new().modified_before(Timestamp::from_secs(200)),
            now,
        )
        .await
        .unwrap();
    assert_eq!(ids(&before), ["early"]);
}

#[tokio::test]
async fn test_sort_parsed_from_request_string() {
    let (storage, _clock, alice) = test_storage_with_user("alice").await;
    put(&storage, &alice, "c", NewObject::new("first", "")).await;
    put(&storage, &alice, "c", NewObject::new("second", "")).await;

    let sort: SortOrder = "Newest".parse().unwrap();
    let newest = storage
        .query(&alice, "c", &ObjectQuery::new().sort(sort), storage.now())
        .await
        .unwrap();
    assert_eq!(ids(&newest), ["second", "first"]);

    let err: weavestore::Error = "random".parse::<SortOrder>().unwrap_err().into();
    assert!(err.is_invalid_argument());
}

#[tokio::test]
async fn test_pages_cover_collection_without_overlap() {
    let (storage, _clock, alice) = test_storage_with_user("alice").await;
    for i in 0..10 {
        put(&storage, &alice, "c", NewObject::new(format!("o{i}"), "").with_sort_index(i % 3)).await;
    }
    let now = storage.now();

    let mut seen = Vec::new();
    for page in 0..4 {
        let query = ObjectQuery::new().sort(SortOrder::Index).limit(3).offset(page * 3);
        let objects = storage.query(&alice, "c", &query, now).await.unwrap();
        seen.extend(objects.into_iter().map(|o| o.id));
    }
    assert_eq!(seen.len(), 10);
    let mut unique = seen.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), 10);

    // Highest index first, then by insertion within a tie
    assert_eq!(&seen[..4], ["o2", "o5", "o8", "o1"]);
}
