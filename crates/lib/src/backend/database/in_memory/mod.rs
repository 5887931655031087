//! In-memory database backend implementation
//!
//! This module provides an in-memory implementation of [`BackendImpl`],
//! suitable for testing, development, or scenarios where data persistence
//! is not strictly required or is handled externally.

mod persistence;
mod storage;

use std::any::Any;
use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::Result;
use crate::backend::BackendImpl;
use crate::entity::{
    BasicObject, Collection, CollectionId, CollectionStats, CollectionSummary, NewObject,
    NewUser, ObjectKey, Timestamp, User, UserId,
};
use crate::query::ObjectQuery;

/// Everything the backend holds, guarded by one lock so that every operation
/// (including cascades) is applied atomically.
#[derive(Debug, Default)]
pub(crate) struct State {
    pub(crate) users: BTreeMap<UserId, User>,
    pub(crate) collections: BTreeMap<CollectionId, Collection>,
    pub(crate) objects: BTreeMap<ObjectKey, BasicObject>,
    /// Last identifier handed out per table. Identifiers are never reused.
    pub(crate) last_user: i64,
    pub(crate) last_collection: i64,
    pub(crate) last_object: i64,
}

/// A simple in-memory database implementation using ordered maps for storage.
///
/// It provides basic persistence capabilities via `save_to_file` and
/// `load_from_file`, serializing the whole state to JSON.
///
/// **Security Note**: user credential material is held and saved as given.
/// Only the identity layer decides whether that is a hash or something else.
#[derive(Debug, Default)]
pub struct InMemory {
    pub(crate) state: RwLock<State>,
}

impl InMemory {
    /// Creates a new, empty `InMemory` database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects, expired ones included.
    pub async fn object_count(&self) -> usize {
        self.state.read().await.objects.len()
    }

    /// Saves the entire database state to a specified file as JSON.
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        persistence::save_to_file(self, path).await
    }

    /// Loads the database state from a specified JSON file.
    ///
    /// If the file does not exist, a new, empty `InMemory` database is returned.
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        persistence::load_from_file(path).await
    }
}

#[async_trait]
impl BackendImpl for InMemory {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        storage::create_user(self, user).await
    }

    async fn find_user(&self, username: &str) -> Result<Option<User>> {
        storage::find_user(self, username).await
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        storage::list_users(self).await
    }

    async fn update_password(&self, username: &str, password: &str) -> Result<()> {
        storage::update_user(self, username, |user| user.password = password.to_string()).await
    }

    async fn update_email(&self, username: &str, email: &str) -> Result<()> {
        storage::update_user(self, username, |user| user.email = email.to_string()).await
    }

    async fn delete_user(&self, username: &str) -> Result<()> {
        storage::delete_user(self, username).await
    }

    async fn resolve_collection(&self, user: UserId, name: &str) -> Result<Collection> {
        storage::resolve_collection(self, user, name).await
    }

    async fn find_collection(&self, user: UserId, name: &str) -> Result<Option<Collection>> {
        let state = self.state.read().await;
        Ok(state.find_collection(user, name).cloned())
    }

    async fn list_collections(&self, user: UserId) -> Result<Vec<Collection>> {
        storage::list_collections(self, user).await
    }

    async fn delete_collection(&self, collection: CollectionId) -> Result<()> {
        storage::delete_collections(self, |c| c.id == collection).await
    }

    async fn delete_collection_by_name(&self, user: UserId, name: &str) -> Result<()> {
        storage::delete_collections(self, |c| c.user == user && c.name == name).await
    }

    async fn delete_all_collections(&self, user: UserId) -> Result<()> {
        storage::delete_collections(self, |c| c.user == user).await
    }

    async fn collection_stats(
        &self,
        user: UserId,
        name: &str,
        as_of: Timestamp,
    ) -> Result<CollectionStats> {
        storage::collection_stats(self, user, name, as_of).await
    }

    async fn collection_summaries(
        &self,
        user: UserId,
        as_of: Timestamp,
    ) -> Result<Vec<CollectionSummary>> {
        storage::collection_summaries(self, user, as_of).await
    }

    async fn user_payload_bytes(&self, user: UserId, as_of: Timestamp) -> Result<u64> {
        storage::user_payload_bytes(self, user, as_of).await
    }

    async fn get_object(
        &self,
        user: UserId,
        name: &str,
        id: &str,
        as_of: Timestamp,
    ) -> Result<Option<BasicObject>> {
        storage::get_object(self, user, name, id, as_of).await
    }

    async fn query_objects(
        &self,
        user: UserId,
        name: &str,
        query: &ObjectQuery,
        as_of: Timestamp,
    ) -> Result<Vec<BasicObject>> {
        storage::query_objects(self, user, name, query, as_of).await
    }

    async fn put_object(
        &self,
        user: UserId,
        name: &str,
        object: NewObject,
        modified: Timestamp,
    ) -> Result<BasicObject> {
        storage::put_object(self, user, name, object, modified).await
    }

    async fn delete_object(&self, key: ObjectKey) -> Result<()> {
        self.state.write().await.objects.remove(&key);
        Ok(())
    }

    async fn purge_expired(&self, now: Timestamp) -> Result<u64> {
        storage::purge_expired(self, now).await
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
