//! Shared helpers for benchmark tests

use weavestore::{
    NewObject, NewUser, Storage, User,
    backend::{BackendImpl, database::InMemory},
};

/// Creates a test backend based on TEST_BACKEND env var.
///
/// Supported values:
/// - "inmemory" or unset: InMemory backend (default)
/// - "sqlite": SQLite in-memory backend (requires `sqlite` feature)
async fn test_backend() -> Box<dyn BackendImpl> {
    match std::env::var("TEST_BACKEND").as_deref() {
        Ok("sqlite") => {
            #[cfg(feature = "sqlite")]
            {
                use weavestore::backend::database::Sqlite;
                Box::new(
                    Sqlite::sqlite_in_memory()
                        .await
                        .expect("Failed to create SQLite backend"),
                )
            }
            #[cfg(not(feature = "sqlite"))]
            {
                panic!("TEST_BACKEND=sqlite requires the 'sqlite' feature to be enabled")
            }
        }
        Ok("inmemory") | Ok("") | Err(_) => Box::new(InMemory::new()),
        Ok(other) => {
            panic!("Unknown TEST_BACKEND value: {other}. Supported: inmemory, sqlite")
        }
    }
}

/// Creates storage with one registered user.
pub async fn setup_storage_async() -> (Storage, User) {
    let storage = Storage::open(test_backend().await);
    let user = storage
        .create_user(NewUser::new("bench_user", "bench", "bench@example.com"))
        .await
        .expect("Failed to create user");
    (storage, user)
}

/// Creates storage whose `bench` collection holds `count` objects.
///
/// Object `i` has id `obj_i`, sort index `i` and every tenth one has parent `p`.
pub async fn setup_collection_async(count: usize) -> (Storage, User) {
    let (storage, user) = setup_storage_async().await;
    for i in 0..count {
        let mut object = NewObject::new(format!("obj_{i}"), format!("{{\"n\":{i}}}"))
            .with_sort_index(i as i64);
        if i % 10 == 0 {
            object = object.with_parent("p");
        }
        storage
            .insert(&user, "bench", object)
            .await
            .expect("Failed to insert object");
    }
    (storage, user)
}
