//! Storage engine error types.
//!
//! These cover caller mistakes the engine rejects before touching the store.
//! Store failures arrive as [`BackendError`](crate::backend::BackendError).

use thiserror::Error;

/// Errors raised by [`Storage`](super::Storage) argument validation.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// An object was written without an `id`.
    #[error("Object id is required")]
    MissingObjectId,

    /// A collection was named with the empty string.
    #[error("Collection name is required")]
    MissingCollectionName,

    /// A user was registered without a username.
    #[error("Username is required")]
    MissingUsername,
}

impl StorageError {
    /// Check if this error is a rejected argument.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            StorageError::MissingObjectId
                | StorageError::MissingCollectionName
                | StorageError::MissingUsername
        )
    }
}

impl From<StorageError> for crate::Error {
    fn from(err: StorageError) -> Self {
        crate::Error::Storage(err)
    }
}
