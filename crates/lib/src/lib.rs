//!
//! weavestore: per-user storage for Weave Basic Objects.
//!
//! This library provides the storage engine behind a sync service: users own
//! named collections, collections hold small JSON records ("Basic Objects"),
//! and clients read them back with filters, sorting and pagination.
//!
//! ## Core Concepts
//!
//! * **Entities (`entity`)**: `User`, `Collection` and `BasicObject`, plus the
//!   write-side `NewObject` and the `CollectionStats` aggregate.
//! * **Storage (`Storage`)**: The engine. It scopes every operation to a user,
//!   creates collections on first write, upserts objects by id and cascades
//!   deletes.
//! * **Queries (`query::ObjectQuery`)**: Conjunctive filters over ids, parent,
//!   predecessor, modification time and sort index, with `oldest`, `newest` or
//!   `index` ordering and `limit`/`offset` pagination.
//! * **Expiry (`expiry`)**: Objects with a `ttl` in the past are hidden from
//!   every read and reclaimed in the background by the `expiry::Reaper`.
//! * **Backends (`backend::BackendImpl`)**: A pluggable store. `InMemory` (with
//!   JSON file persistence) and a sqlx backend for SQLite and PostgreSQL.

pub mod backend;
pub mod clock;
pub mod entity;
pub mod expiry;
pub mod query;
pub mod storage;

pub use clock::{Clock, SystemClock};
#[cfg(any(test, feature = "testing"))]
pub use clock::{ClockHold, FixedClock};
pub use entity::{
    BasicObject, Collection, CollectionStats, CollectionSummary, NewObject, NewUser, Timestamp,
    User,
};
pub use storage::Storage;

/// Result type used throughout the weavestore library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the weavestore library.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured errors from the storage backends
    #[error(transparent)]
    Backend(backend::BackendError),

    /// Argument validation errors from the storage engine
    #[error(transparent)]
    Storage(storage::StorageError),

    /// Invalid query arguments
    #[error(transparent)]
    Query(query::QueryError),

    /// Errors talking to the background reaper
    #[error(transparent)]
    Reaper(expiry::ReaperError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Backend(_) => "backend",
            Error::Storage(_) => "storage",
            Error::Query(_) => "query",
            Error::Reaper(_) => "expiry",
            Error::Io(_) => "io",
            Error::Serialize(_) => "serialize",
        }
    }

    /// Check if this error indicates a resource was not found.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Backend(backend_err) => backend_err.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error indicates a conflict (already exists).
    pub fn is_conflict(&self) -> bool {
        match self {
            Error::Backend(backend_err) => backend_err.is_conflict(),
            _ => false,
        }
    }

    /// Check if this error is validation-related.
    pub fn is_validation_error(&self) -> bool {
        match self {
            Error::Storage(storage_err) => storage_err.is_validation_error(),
            _ => false,
        }
    }

    /// Check if this error is a rejected query argument.
    pub fn is_invalid_argument(&self) -> bool {
        match self {
            Error::Query(query_err) => query_err.is_invalid_argument(),
            _ => false,
        }
    }

    /// Check if this error is database/backend-related.
    pub fn is_backend_error(&self) -> bool {
        matches!(self, Error::Backend(_))
    }

    /// Check if this error indicates a data integrity issue.
    pub fn is_integrity_error(&self) -> bool {
        match self {
            Error::Backend(backend_err) => backend_err.is_integrity_error(),
            _ => false,
        }
    }

    /// Check if this error is I/O related.
    pub fn is_io_error(&self) -> bool {
        match self {
            Error::Io(_) | Error::Serialize(_) => true,
            Error::Backend(backend_err) => backend_err.is_io_error(),
            _ => false,
        }
    }

    /// Check if the background reaper is gone.
    pub fn is_reaper_stopped(&self) -> bool {
        match self {
            Error::Reaper(reaper_err) => reaper_err.is_stopped(),
            _ => false,
        }
    }
}
