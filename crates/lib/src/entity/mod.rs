//! Entity model: users, collections and Weave Basic Objects.
//!
//! These are passive records. Identity is always the store-assigned key
//! (`UserId`, `CollectionId`, `ObjectKey`); business keys such as a username
//! or an object's `id` are only unique within their owner.

use std::fmt;

use serde::{Deserialize, Serialize};

mod timestamp;

pub use timestamp::Timestamp;

macro_rules! storage_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wrap a raw store-assigned identifier.
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// The raw identifier as stored.
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

storage_id!(
    /// Internal identifier of a [`User`].
    UserId
);
storage_id!(
    /// Internal identifier of a [`Collection`].
    CollectionId
);
storage_id!(
    /// Internal storage identity of a [`BasicObject`].
    ObjectKey
);

/// A principal owning collections.
///
/// The engine only ever uses `id` for scoping. `password` is opaque credential
/// material owned by the identity layer.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub password: String,
    pub email: String,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("email", &self.email)
            .finish()
    }
}

/// Fields supplied by the identity layer when registering a user.
#[derive(Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub email: String,
}

impl NewUser {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            email: email.into(),
        }
    }
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("email", &self.email)
            .finish()
    }
}

/// A named bucket of objects owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Collection {
    pub id: CollectionId,
    pub name: String,
    pub user: UserId,
}

/// A stored Weave Basic Object.
///
/// Two objects are equal when they are the same stored row, i.e. share a
/// [`ObjectKey`]. Objects in unrelated collections may reuse the same `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicObject {
    pub key: ObjectKey,
    pub id: String,
    pub parent_id: Option<String>,
    pub predecessor_id: Option<String>,
    pub modified: Timestamp,
    /// Absolute expiry in seconds since the epoch. `None` never expires.
    pub ttl: Option<i64>,
    pub sort_index: Option<i64>,
    pub payload: String,
    pub collection: CollectionId,
}

impl BasicObject {
    /// Payload length in bytes, the unit size aggregates are summed in.
    pub fn payload_size(&self) -> u64 {
        self.payload.len() as u64
    }

    /// Whether this object is invisible to a read at `as_of`.
    pub fn is_expired_at(&self, as_of: Timestamp) -> bool {
        crate::expiry::is_expired(self.ttl, as_of)
    }
}

impl PartialEq for BasicObject {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for BasicObject {}

impl std::hash::Hash for BasicObject {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

/// Writer-supplied fields of an object.
///
/// `modified` and the owning collection are deliberately absent: the engine
/// assigns both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewObject {
    pub id: String,
    pub parent_id: Option<String>,
    pub predecessor_id: Option<String>,
    pub ttl: Option<i64>,
    pub sort_index: Option<i64>,
    pub payload: String,
}

impl NewObject {
    pub fn new(id: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            payload: payload.into(),
            ..Default::default()
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_predecessor(mut self, predecessor_id: impl Into<String>) -> Self {
        self.predecessor_id = Some(predecessor_id.into());
        self
    }

    pub fn with_ttl(mut self, ttl: i64) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_sort_index(mut self, sort_index: i64) -> Self {
        self.sort_index = Some(sort_index);
        self
    }

    /// Attach engine-assigned fields, producing the stored form.
    pub(crate) fn into_object(
        self,
        key: ObjectKey,
        collection: CollectionId,
        modified: Timestamp,
    ) -> BasicObject {
        BasicObject {
            key,
            id: self.id,
            parent_id: self.parent_id,
            predecessor_id: self.predecessor_id,
            modified,
            ttl: self.ttl,
            sort_index: self.sort_index,
            payload: self.payload,
            collection,
        }
    }
}

/// Aggregate over the non-expired objects of one collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionStats {
    /// Newest `modified`, or [`Timestamp::ZERO`] when nothing is visible.
    pub last_modified: Timestamp,
    pub count: u64,
    /// Summed payload bytes, integer-divided by 1024.
    pub size_kib: u64,
}

impl CollectionStats {
    /// Build stats from raw sums, applying the KiB convention.
    pub fn from_totals(last_modified: Option<Timestamp>, count: u64, payload_bytes: u64) -> Self {
        Self {
            last_modified: last_modified.unwrap_or(Timestamp::ZERO),
            count,
            size_kib: payload_bytes / 1024,
        }
    }
}

/// A collection name paired with its aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSummary {
    pub name: String,
    pub stats: CollectionStats,
}
