//! Persistence operations for InMemory database
//!
//! This module handles serialization and file I/O for saving/loading
//! the in-memory database state to/from JSON files.

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use tokio::sync::RwLock;

use super::{InMemory, State};
use crate::{
    Error, Result,
    backend::errors::BackendError,
    entity::{BasicObject, Collection, User},
};

/// The current persistence file format version.
/// v0 indicates this is an unstable format subject to breaking changes.
const PERSISTENCE_VERSION: u8 = 0;

/// Helper to check if version is default (0) for serde skip_serializing_if
fn is_v0(v: &u8) -> bool {
    *v == 0
}

/// Validates the persistence version during deserialization.
fn validate_persistence_version<'de, D>(deserializer: D) -> std::result::Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let version = u8::deserialize(deserializer)?;
    if version != PERSISTENCE_VERSION {
        return Err(serde::de::Error::custom(format!(
            "unsupported persistence version {version}; only version {PERSISTENCE_VERSION} is supported"
        )));
    }
    Ok(version)
}

/// On-disk form of the database state
#[derive(Serialize, Deserialize)]
struct SerializableDatabase {
    /// File format version for compatibility checking
    #[serde(
        rename = "_v",
        default,
        skip_serializing_if = "is_v0",
        deserialize_with = "validate_persistence_version"
    )]
    version: u8,
    users: Vec<User>,
    collections: Vec<Collection>,
    objects: Vec<BasicObject>,
    /// Identifier high-water marks, so deleted identifiers stay retired
    #[serde(default)]
    last_user: i64,
    #[serde(default)]
    last_collection: i64,
    #[serde(default)]
    last_object: i64,
}

impl From<&State> for SerializableDatabase {
    fn from(state: &State) -> Self {
        Self {
            version: PERSISTENCE_VERSION,
            users: state.users.values().cloned().collect(),
            collections: state.collections.values().cloned().collect(),
            objects: state.objects.values().cloned().collect(),
            last_user: state.last_user,
            last_collection: state.last_collection,
            last_object: state.last_object,
        }
    }
}

impl From<SerializableDatabase> for State {
    fn from(saved: SerializableDatabase) -> Self {
        // Older files may lack the high-water marks; never hand out a live id
        let last_user = saved
            .users
            .iter()
            .map(|u| u.id.get())
            .fold(saved.last_user, i64::max);
        let last_collection = saved
            .collections
            .iter()
            .map(|c| c.id.get())
            .fold(saved.last_collection, i64::max);
        let last_object = saved
            .objects
            .iter()
            .map(|o| o.key.get())
            .fold(saved.last_object, i64::max);

        State {
            users: saved.users.into_iter().map(|u| (u.id, u)).collect(),
            collections: saved.collections.into_iter().map(|c| (c.id, c)).collect(),
            objects: saved.objects.into_iter().map(|o| (o.key, o)).collect(),
            last_user,
            last_collection,
            last_object,
        }
    }
}

/// Saves the entire database state to a specified file as JSON.
pub(crate) async fn save_to_file<P: AsRef<Path>>(backend: &InMemory, path: P) -> Result<()> {
    let serializable = {
        let state = backend.state.read().await;
        SerializableDatabase::from(&*state)
    };

    let json = serde_json::to_string_pretty(&serializable)
        .map_err(|e| -> Error { BackendError::SerializationFailed { source: e }.into() })?;
    tokio::fs::write(path, json)
        .await
        .map_err(|e| -> Error { BackendError::FileIo { source: e }.into() })
}

/// Loads the database state from a specified JSON file.
///
/// If the file does not exist, a new, empty `InMemory` database is returned.
pub(crate) async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<InMemory> {
    match tokio::fs::read_to_string(path).await {
        Ok(json) => {
            let saved: SerializableDatabase = serde_json::from_str(&json).map_err(|e| -> Error {
                BackendError::DeserializationFailed { source: e }.into()
            })?;
            Ok(InMemory {
                state: RwLock::new(State::from(saved)),
            })
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(InMemory::new()),
        Err(e) => Err(BackendError::FileIo { source: e }.into()),
    }
}
