//! The storage engine.
//!
//! [`Storage`] is the per-user object store: it scopes every operation to a
//! [`User`], validates arguments, stamps writes from its [`Clock`] and hands
//! the work to a [`BackendImpl`]. Every backend call is one transaction, so
//! the engine itself holds no mutable state.
//!
//! Reads take an explicit `as_of` [`Timestamp`]. Callers fix it once per
//! logical request with [`Storage::now`] so that every read in the request
//! applies the same expiry horizon.

use std::sync::Arc;
use std::time::Duration;

use handle_trait::Handle;
use tracing::{debug, instrument};

use crate::{
    Clock, Result, SystemClock,
    backend::BackendImpl,
    entity::{
        BasicObject, Collection, CollectionStats, CollectionSummary, NewObject, ObjectKey,
        Timestamp, User,
    },
    expiry::{Reaper, ReaperHandle},
    query::ObjectQuery,
};

pub mod errors;
mod users;


pub use errors::StorageError;

/// Internal state for Storage.
///
/// Storage itself is just a cheap-to-clone handle wrapping `Arc<StorageInternal>`.
struct StorageInternal {
    backend: Arc<dyn BackendImpl>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for StorageInternal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageInternal")
            .field("backend", &"<BackendImpl>")
            .field("clock", &self.clock)
            .finish()
    }
}

/// Per-user Weave Basic Object storage on top of a backend.
///
/// ## Example
///
/// ```
/// # use weavestore::{Storage, backend::database::InMemory};
/// # use weavestore::entity::{NewObject, NewUser};
/// # use weavestore::query::{ObjectQuery, SortOrder};
/// # #[tokio::main]
/// # async fn main() -> weavestore::Result<()> {
/// let storage = Storage::open(Box::new(InMemory::new()));
/// let alice = storage.create_user(NewUser::new("alice", "secret", "alice@example.com")).await?;
///
/// storage.insert(&alice, "bookmarks", NewObject::new("b1", "{}").with_sort_index(5)).await?;
///
/// let as_of = storage.now();
/// let newest = storage
///     .query(&alice, "bookmarks", &ObjectQuery::new().sort(SortOrder::Newest), as_of)
///     .await?;
/// assert_eq!(newest.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Handle)]
pub struct Storage {
    inner: Arc<StorageInternal>,
}

impl Storage {
    /// Open storage over a backend, using the system clock.
    pub fn open(backend: Box<dyn BackendImpl>) -> Self {
        Self::open_impl(backend, Arc::new(SystemClock))
    }

    /// Open storage with a custom clock for controllable timestamps in tests.
    ///
    /// Only available with the `testing` feature or in test builds.
    #[cfg(any(test, feature = "testing"))]
    pub fn open_with_clock(backend: Box<dyn BackendImpl>, clock: Arc<dyn Clock>) -> Self {
        Self::open_impl(backend, clock)
    }

    fn open_impl(backend: Box<dyn BackendImpl>, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(StorageInternal {
                backend: Arc::from(backend),
                clock,
            }),
        }
    }

    /// The backend this storage writes to.
    pub fn backend(&self) -> &dyn BackendImpl {
        self.inner.backend.as_ref()
    }

    /// The current instant according to this storage's clock.
    ///
    /// Use the result as the `as_of` of every read in one logical request.
    /// Expiry compares whole seconds: reads treat `as_of` as floored to the
    /// second, so an object stays visible through the entire second its
    /// `ttl` names.
    pub fn now(&self) -> Timestamp {
        self.inner.clock.now()
    }

    fn require_name(name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(StorageError::MissingCollectionName.into());
        }
        Ok(())
    }

    // === Collection registry ===

    /// Return the user's collection `name`, creating it if needed.
    ///
    /// Calling this twice, or concurrently, yields the same collection.
    #[instrument(level = "debug", skip(self, user), fields(user = %user.id))]
    pub async fn resolve_collection(&self, user: &User, name: &str) -> Result<Collection> {
        Self::require_name(name)?;
        self.inner.backend.resolve_collection(user.id, name).await
    }

    /// Look up a collection without creating it.
    pub async fn find_collection(&self, user: &User, name: &str) -> Result<Option<Collection>> {
        self.inner.backend.find_collection(user.id, name).await
    }

    /// All of the user's collections, ordered by name.
    pub async fn list_collections(&self, user: &User) -> Result<Vec<Collection>> {
        self.inner.backend.list_collections(user.id).await
    }

    // === Reads ===

    /// Newest modification, count and size of the visible objects in a collection.
    ///
    /// A missing or empty collection yields zero for all three.
    pub async fn aggregate(
        &self,
        user: &User,
        name: &str,
        as_of: Timestamp,
    ) -> Result<CollectionStats> {
        self.inner
            .backend
            .collection_stats(user.id, name, as_of)
            .await
    }

    /// One aggregate per existing collection, ordered by collection name.
    pub async fn collection_summaries(
        &self,
        user: &User,
        as_of: Timestamp,
    ) -> Result<Vec<CollectionSummary>> {
        self.inner
            .backend
            .collection_summaries(user.id, as_of)
            .await
    }

    /// Size of all the user's visible objects in KiB.
    pub async fn total_size(&self, user: &User, as_of: Timestamp) -> Result<u64> {
        let bytes = self.inner.backend.user_payload_bytes(user.id, as_of).await?;
        Ok(bytes / 1024)
    }

    /// Fetch one object. `Ok(None)` when it is absent or expired as of the
    /// whole second containing `as_of`.
    pub async fn get_object(
        &self,
        user: &User,
        name: &str,
        id: &str,
        as_of: Timestamp,
    ) -> Result<Option<BasicObject>> {
        self.inner.backend.get_object(user.id, name, id, as_of).await
    }

    /// Filtered, sorted and paginated read of one collection.
    #[instrument(level = "debug", skip(self, user, query), fields(user = %user.id))]
    pub async fn query(
        &self,
        user: &User,
        name: &str,
        query: &ObjectQuery,
        as_of: Timestamp,
    ) -> Result<Vec<BasicObject>> {
        let objects = self
            .inner
            .backend
            .query_objects(user.id, name, query, as_of)
            .await?;
        debug!(returned = objects.len(), sort = ?query.sort, "Query complete");
        Ok(objects)
    }

    // === Writes ===

    /// Store an object, replacing any existing one with the same `id`.
    ///
    /// The collection is created on first use and `modified` is stamped from
    /// the clock; both happen in the same transaction as the write.
    #[instrument(level = "debug", skip(self, user, object), fields(user = %user.id, id = %object.id))]
    pub async fn insert(&self, user: &User, name: &str, object: NewObject) -> Result<BasicObject> {
        Self::require_name(name)?;
        if object.id.is_empty() {
            return Err(StorageError::MissingObjectId.into());
        }
        let modified = self.now();
        let stored = self
            .inner
            .backend
            .put_object(user.id, name, object, modified)
            .await?;
        debug!(key = %stored.key, "Stored object");
        Ok(stored)
    }

    /// Delete a stored object. Deleting it twice is not an error.
    pub async fn delete(&self, object: &BasicObject) -> Result<()> {
        self.delete_object(object.key).await
    }

    /// Delete an object by storage key.
    pub async fn delete_object(&self, key: ObjectKey) -> Result<()> {
        debug!(%key, "Deleting object");
        self.inner.backend.delete_object(key).await
    }

    /// Delete a collection and all its objects. No-op if it does not exist.
    #[instrument(level = "debug", skip(self, user), fields(user = %user.id))]
    pub async fn delete_collection(&self, user: &User, name: &str) -> Result<()> {
        Self::require_name(name)?;
        self.inner
            .backend
            .delete_collection_by_name(user.id, name)
            .await
    }

    /// Delete every collection of the user. The user itself remains.
    #[instrument(level = "debug", skip(self, user), fields(user = %user.id))]
    pub async fn delete_all_collections(&self, user: &User) -> Result<()> {
        self.inner.backend.delete_all_collections(user.id).await
    }

    // === Expiry ===

    /// Physically remove every expired object, for all users, as of now.
    pub async fn purge_expired(&self) -> Result<u64> {
        self.purge_expired_at(self.now()).await
    }

    /// Physically remove every object that is expired at `now`.
    ///
    /// Returns the number removed. Running it again removes nothing.
    pub async fn purge_expired_at(&self, now: Timestamp) -> Result<u64> {
        let removed = self.inner.backend.purge_expired(now).await?;
        debug!(removed, horizon = now.as_secs(), "Purged expired objects");
        Ok(removed)
    }

    /// Spawn a background [`Reaper`] sweeping this storage every `period`.
    pub fn start_reaper(&self, period: Duration) -> ReaperHandle {
        Reaper::start(self.handle(), period)
    }
}
