use weavestore::{NewObject, NewUser};

use crate::helpers::{put, test_storage, test_storage_with_user};

#[tokio::test]
async fn test_create_and_find_user() {
    let (storage, _clock) = test_storage().await;
    let created = storage
        .create_user(NewUser::new("alice", "hash", "alice@example.com"))
        .await
        .unwrap();
    let found = storage.find_user("alice").await.unwrap().unwrap();
    assert_eq!(created, found);
    assert!(storage.find_user("bob").await.unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_username_is_conflict() {
    let (storage, _clock, _alice) = test_storage_with_user("alice").await;
    let err = storage
        .create_user(NewUser::new("alice", "other", ""))
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(err.module(), "backend");
}

#[tokio::test]
async fn test_list_users_sorted() {
    let (storage, _clock) = test_storage().await;
    for name in ["carol", "alice", "bob"] {
        storage.create_user(NewUser::new(name, "pw", "")).await.unwrap();
    }
    let names: Vec<String> = storage
        .list_users()
        .await
        .unwrap()
        .into_iter()
        .map(|u| u.username)
        .collect();
    assert_eq!(names, ["alice", "bob", "carol"]);
}

#[tokio::test]
async fn test_update_credentials() {
    let (storage, _clock, _alice) = test_storage_with_user("alice").await;
    storage.update_password("alice", "new-hash").await.unwrap();
    storage.update_email("alice", "new@example.com").await.unwrap();
    let alice = storage.find_user("alice").await.unwrap().unwrap();
    assert_eq!(alice.password, "new-hash");
    assert_eq!(alice.email, "new@example.com");

    assert!(storage.update_password("nobody", "x").await.unwrap_err().is_not_found());
    assert!(storage.update_email("nobody", "x").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_delete_user_cascades() {
    let (storage, _clock, alice) = test_storage_with_user("alice").await;
    put(&storage, &alice, "tabs", NewObject::new("t", "")).await;
    put(&storage, &alice, "bookmarks", NewObject::new("b", "")).await;

    storage.delete_user("alice").await.unwrap();
    assert!(storage.find_user("alice").await.unwrap().is_none());
    assert!(storage.list_collections(&alice).await.unwrap().is_empty());
    assert!(storage.delete_user("alice").await.unwrap_err().is_not_found());

    // A handle kept across the delete cannot recreate anything
    let err = storage
        .insert(&alice, "tabs", NewObject::new("late", ""))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(storage.list_collections(&alice).await.unwrap().is_empty());

    // The username can be registered again, with nothing attached
    let again = storage
        .create_user(NewUser::new("alice", "pw", ""))
        .await
        .unwrap();
    assert_ne!(again.id, alice.id);
    assert!(storage.list_collections(&again).await.unwrap().is_empty());
}
