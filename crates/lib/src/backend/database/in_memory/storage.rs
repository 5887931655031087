//! Core storage operations for InMemory database
//!
//! Every operation takes the state lock once, so reads see a consistent
//! snapshot and writes (cascades included) are all-or-nothing.

use std::collections::{BTreeMap, HashSet};

use super::{InMemory, State};
use crate::{
    Result,
    backend::errors::BackendError,
    entity::{
        BasicObject, Collection, CollectionId, CollectionStats, CollectionSummary, NewObject,
        NewUser, ObjectKey, Timestamp, User, UserId,
    },
    expiry,
    query::ObjectQuery,
};

impl State {
    pub(crate) fn find_collection(&self, user: UserId, name: &str) -> Option<&Collection> {
        self.collections
            .values()
            .find(|c| c.user == user && c.name == name)
    }

    fn find_user(&self, username: &str) -> Option<&User> {
        self.users.values().find(|u| u.username == username)
    }

    /// Visible objects of one collection, in key order.
    fn visible_objects(
        &self,
        collection: CollectionId,
        as_of: Timestamp,
    ) -> impl Iterator<Item = &BasicObject> {
        self.objects
            .values()
            .filter(move |o| o.collection == collection && !o.is_expired_at(as_of))
    }

    fn stats_for(&self, collection: CollectionId, as_of: Timestamp) -> CollectionStats {
        let mut last_modified = None;
        let mut count = 0;
        let mut bytes = 0;
        for object in self.visible_objects(collection, as_of) {
            last_modified = last_modified.max(Some(object.modified));
            count += 1;
            bytes += object.payload_size();
        }
        CollectionStats::from_totals(last_modified, count, bytes)
    }

    fn resolve_collection(&mut self, user: UserId, name: &str) -> Result<Collection> {
        if let Some(existing) = self.find_collection(user, name) {
            return Ok(existing.clone());
        }
        if !self.users.contains_key(&user) {
            return Err(BackendError::OwnerNotFound { user }.into());
        }
        self.last_collection += 1;
        let collection = Collection {
            id: CollectionId::new(self.last_collection),
            name: name.to_string(),
            user,
        };
        self.collections.insert(collection.id, collection.clone());
        Ok(collection)
    }

    /// Drop collections matching `predicate` together with their objects.
    fn remove_collections(&mut self, predicate: impl Fn(&Collection) -> bool) {
        let doomed: HashSet<CollectionId> = self
            .collections
            .values()
            .filter(|c| predicate(c))
            .map(|c| c.id)
            .collect();
        if doomed.is_empty() {
            return;
        }
        self.objects.retain(|_, o| !doomed.contains(&o.collection));
        self.collections.retain(|id, _| !doomed.contains(id));
    }
}

pub(crate) async fn create_user(backend: &InMemory, user: NewUser) -> Result<User> {
    let mut state = backend.state.write().await;
    if state.find_user(&user.username).is_some() {
        return Err(BackendError::UsernameTaken {
            username: user.username,
        }
        .into());
    }
    state.last_user += 1;
    let created = User {
        id: UserId::new(state.last_user),
        username: user.username,
        password: user.password,
        email: user.email,
    };
    state.users.insert(created.id, created.clone());
    Ok(created)
}

pub(crate) async fn find_user(backend: &InMemory, username: &str) -> Result<Option<User>> {
    let state = backend.state.read().await;
    Ok(state.find_user(username).cloned())
}

pub(crate) async fn list_users(backend: &InMemory) -> Result<Vec<User>> {
    let state = backend.state.read().await;
    let mut users: Vec<User> = state.users.values().cloned().collect();
    users.sort_by(|a, b| a.username.cmp(&b.username));
    Ok(users)
}

pub(crate) async fn update_user(
    backend: &InMemory,
    username: &str,
    apply: impl FnOnce(&mut User) + Send,
) -> Result<()> {
    let mut state = backend.state.write().await;
    let user = state
        .users
        .values_mut()
        .find(|u| u.username == username)
        .ok_or_else(|| BackendError::UserNotFound {
            username: username.to_string(),
        })?;
    apply(user);
    Ok(())
}

pub(crate) async fn delete_user(backend: &InMemory, username: &str) -> Result<()> {
    let mut state = backend.state.write().await;
    let id = state
        .find_user(username)
        .map(|u| u.id)
        .ok_or_else(|| BackendError::UserNotFound {
            username: username.to_string(),
        })?;
    state.remove_collections(|c| c.user == id);
    state.users.remove(&id);
    Ok(())
}

pub(crate) async fn resolve_collection(
    backend: &InMemory,
    user: UserId,
    name: &str,
) -> Result<Collection> {
    // Fast path under the read lock; most writes hit an existing collection
    if let Some(existing) = backend.state.read().await.find_collection(user, name) {
        return Ok(existing.clone());
    }
    backend.state.write().await.resolve_collection(user, name)
}

pub(crate) async fn list_collections(backend: &InMemory, user: UserId) -> Result<Vec<Collection>> {
    let state = backend.state.read().await;
    let mut collections: Vec<Collection> = state
        .collections
        .values()
        .filter(|c| c.user == user)
        .cloned()
        .collect();
    collections.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(collections)
}

pub(crate) async fn delete_collections(
    backend: &InMemory,
    predicate: impl Fn(&Collection) -> bool + Send,
) -> Result<()> {
    backend.state.write().await.remove_collections(predicate);
    Ok(())
}

pub(crate) async fn collection_stats(
    backend: &InMemory,
    user: UserId,
    name: &str,
    as_of: Timestamp,
) -> Result<CollectionStats> {
    let state = backend.state.read().await;
    Ok(state
        .find_collection(user, name)
        .map(|c| state.stats_for(c.id, as_of))
        .unwrap_or_default())
}

pub(crate) async fn collection_summaries(
    backend: &InMemory,
    user: UserId,
    as_of: Timestamp,
) -> Result<Vec<CollectionSummary>> {
    let state = backend.state.read().await;
    // Keyed by name so the result comes out ordered
    let summaries: BTreeMap<&str, CollectionStats> = state
        .collections
        .values()
        .filter(|c| c.user == user)
        .map(|c| (c.name.as_str(), state.stats_for(c.id, as_of)))
        .collect();
    Ok(summaries
        .into_iter()
        .map(|(name, stats)| CollectionSummary {
            name: name.to_string(),
            stats,
        })
        .collect())
}

pub(crate) async fn user_payload_bytes(
    backend: &InMemory,
    user: UserId,
    as_of: Timestamp,
) -> Result<u64> {
    let state = backend.state.read().await;
    let owned: HashSet<CollectionId> = state
        .collections
        .values()
        .filter(|c| c.user == user)
        .map(|c| c.id)
        .collect();
    Ok(state
        .objects
        .values()
        .filter(|o| owned.contains(&o.collection) && !o.is_expired_at(as_of))
        .map(BasicObject::payload_size)
        .sum())
}

pub(crate) async fn get_object(
    backend: &InMemory,
    user: UserId,
    name: &str,
    id: &str,
    as_of: Timestamp,
) -> Result<Option<BasicObject>> {
    let state = backend.state.read().await;
    let Some(collection) = state.find_collection(user, name) else {
        return Ok(None);
    };
    Ok(state
        .visible_objects(collection.id, as_of)
        .find(|o| o.id == id)
        .cloned())
}

pub(crate) async fn query_objects(
    backend: &InMemory,
    user: UserId,
    name: &str,
    query: &ObjectQuery,
    as_of: Timestamp,
) -> Result<Vec<BasicObject>> {
    if query.filter.is_unsatisfiable() {
        return Ok(Vec::new());
    }
    let state = backend.state.read().await;
    let Some(collection) = state.find_collection(user, name) else {
        return Ok(Vec::new());
    };
    let mut matched: Vec<BasicObject> = state
        .visible_objects(collection.id, as_of)
        .filter(|o| query.filter.matches(o))
        .cloned()
        .collect();
    drop(state);

    query.order(&mut matched);
    Ok(query.paginate(matched))
}

pub(crate) async fn put_object(
    backend: &InMemory,
    user: UserId,
    name: &str,
    object: NewObject,
    modified: Timestamp,
) -> Result<BasicObject> {
    let mut state = backend.state.write().await;
    let collection = state.resolve_collection(user, name)?;

    let existing = state
        .objects
        .values()
        .find(|o| o.collection == collection.id && o.id == object.id)
        .map(|o| o.key);
    let key = match existing {
        Some(key) => key,
        None => {
            state.last_object += 1;
            ObjectKey::new(state.last_object)
        }
    };

    let stored = object.into_object(key, collection.id, modified);
    state.objects.insert(key, stored.clone());
    Ok(stored)
}

pub(crate) async fn purge_expired(backend: &InMemory, now: Timestamp) -> Result<u64> {
    let mut state = backend.state.write().await;
    let before = state.objects.len();
    state.objects.retain(|_, o| !expiry::is_expired(o.ttl, now));
    Ok((before - state.objects.len()) as u64)
}
