//! Backend implementations for weavestore storage
//!
//! This module provides the core `BackendImpl` trait and the concrete backends
//! (in-memory, SQLite and PostgreSQL) under [`database`].
//!
//! The trait is the store capability the engine relies on: transactional
//! reads and writes of users, collections and objects, a query mechanism with
//! equality/range predicates plus sort and pagination, and cascading deletes.
//! Each method is one unit of work: it either commits completely or has no
//! effect. The [`Storage`](crate::Storage) engine layers argument validation,
//! clock stamping and logging on top.

use std::any::Any;

use async_trait::async_trait;

use crate::Result;
use crate::entity::{
    BasicObject, Collection, CollectionId, CollectionStats, CollectionSummary, NewObject,
    NewUser, ObjectKey, Timestamp, User, UserId,
};
use crate::query::ObjectQuery;

pub mod database;
pub mod errors;

pub use errors::BackendError;

/// Storage backend abstraction for weavestore.
///
/// All reads take an `as_of` horizon and must hide objects whose `ttl` lies
/// before it (see [`crate::expiry`]). All writes must be atomic, including the
/// cascading deletes.
///
/// Implementations must be `Send` and `Sync` to allow sharing across tasks,
/// and implement `Any` to allow for downcasting (e.g. to save an in-memory
/// backend to disk).
#[async_trait]
pub trait BackendImpl: Send + Sync + Any {
    // === Users ===

    /// Register a user. Fails with [`BackendError::UsernameTaken`] when the
    /// username exists.
    async fn create_user(&self, user: NewUser) -> Result<User>;

    /// Look a user up by username.
    async fn find_user(&self, username: &str) -> Result<Option<User>>;

    /// All users, ordered by username.
    async fn list_users(&self) -> Result<Vec<User>>;

    /// Replace a user's credential material.
    async fn update_password(&self, username: &str, password: &str) -> Result<()>;

    /// Replace a user's contact address.
    async fn update_email(&self, username: &str, email: &str) -> Result<()>;

    /// Delete a user with all collections and objects.
    ///
    /// Fails with [`BackendError::UserNotFound`] when the user does not exist.
    async fn delete_user(&self, username: &str) -> Result<()>;

    // === Collections ===

    /// Return the collection `(user, name)`, creating it if absent.
    ///
    /// Must be atomic: concurrent calls for the same pair converge on one
    /// collection. Fails with [`BackendError::OwnerNotFound`] when `user` is
    /// not registered, so no collection ever outlives its user.
    async fn resolve_collection(&self, user: UserId, name: &str) -> Result<Collection>;

    /// Look a collection up without creating it.
    async fn find_collection(&self, user: UserId, name: &str) -> Result<Option<Collection>>;

    /// All collections of a user, ordered by name.
    async fn list_collections(&self, user: UserId) -> Result<Vec<Collection>>;

    /// Delete a collection and all its objects. A missing collection is a no-op.
    async fn delete_collection(&self, collection: CollectionId) -> Result<()>;

    /// Look up `(user, name)` and delete it with its objects in one unit of
    /// work. A missing collection is a no-op.
    async fn delete_collection_by_name(&self, user: UserId, name: &str) -> Result<()>;

    /// Delete every collection of a user with their objects, keeping the user.
    async fn delete_all_collections(&self, user: UserId) -> Result<()>;

    // === Reads ===

    /// Aggregate over the visible objects of one collection.
    async fn collection_stats(
        &self,
        user: UserId,
        name: &str,
        as_of: Timestamp,
    ) -> Result<CollectionStats>;

    /// Aggregates for every collection of a user, ordered by name.
    async fn collection_summaries(
        &self,
        user: UserId,
        as_of: Timestamp,
    ) -> Result<Vec<CollectionSummary>>;

    /// Total payload bytes of a user's visible objects.
    async fn user_payload_bytes(&self, user: UserId, as_of: Timestamp) -> Result<u64>;

    /// Fetch one visible object by its business id.
    async fn get_object(
        &self,
        user: UserId,
        name: &str,
        id: &str,
        as_of: Timestamp,
    ) -> Result<Option<BasicObject>>;

    /// Run a filtered, sorted, paginated read over one collection.
    async fn query_objects(
        &self,
        user: UserId,
        name: &str,
        query: &ObjectQuery,
        as_of: Timestamp,
    ) -> Result<Vec<BasicObject>>;

    // === Writes ===

    /// Resolve-or-create the collection and upsert the object by `(collection, id)`.
    ///
    /// Replacing an existing object keeps its [`ObjectKey`]. Fails with
    /// [`BackendError::OwnerNotFound`] when `user` is not registered.
    async fn put_object(
        &self,
        user: UserId,
        name: &str,
        object: NewObject,
        modified: Timestamp,
    ) -> Result<BasicObject>;

    /// Delete one object by storage identity. A missing object is a no-op.
    async fn delete_object(&self, key: ObjectKey) -> Result<()>;

    /// Physically remove every object with `ttl` before `now`, across all users.
    ///
    /// Returns the number of objects removed.
    async fn purge_expired(&self, now: Timestamp) -> Result<u64>;

    /// Returns a reference to the backend instance as a dynamic `Any` type.
    fn as_any(&self) -> &dyn Any;
}
