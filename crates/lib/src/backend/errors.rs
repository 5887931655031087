//! Backend error types.
//!
//! Failures of the persistence layer are reported here and surfaced to the
//! caller unchanged. Nothing in the engine retries them.

use thiserror::Error;

use crate::entity::UserId;

/// Errors that can occur inside a storage backend.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum BackendError {
    /// A user with this username is already registered.
    #[error("Username already taken: {username}")]
    UsernameTaken {
        /// The conflicting username
        username: String,
    },

    /// No user with this username exists.
    #[error("User not found: {username}")]
    UserNotFound {
        /// The username that was looked up
        username: String,
    },

    /// A write addressed a user id that is not registered, typically a
    /// handle kept across `delete_user`.
    #[error("User not found: id {user}")]
    OwnerNotFound {
        /// The missing owner
        user: UserId,
    },

    /// Serialization failed.
    #[error("Serialization failed")]
    SerializationFailed {
        /// The underlying serialization error
        #[source]
        source: serde_json::Error,
    },

    /// Deserialization failed.
    #[error("Deserialization failed")]
    DeserializationFailed {
        /// The underlying deserialization error
        #[source]
        source: serde_json::Error,
    },

    /// File I/O error.
    #[error("File I/O error")]
    FileIo {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A stored value could not be mapped back to the entity model.
    #[error("Corrupt row in {table}: {reason}")]
    CorruptRow {
        /// Table the row came from
        table: &'static str,
        /// What was wrong with it
        reason: String,
    },

    /// Error reported by the SQL driver.
    #[cfg(any(feature = "sqlite", feature = "postgres"))]
    #[error("SQL error: {reason}")]
    SqlxError {
        /// Context and driver message
        reason: String,
        /// The driver error, when there is one
        #[source]
        source: Option<sqlx::Error>,
    },
}

impl BackendError {
    /// Check if this error indicates a resource was not found.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            BackendError::UserNotFound { .. } | BackendError::OwnerNotFound { .. }
        )
    }

    /// Check if this error indicates a uniqueness conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, BackendError::UsernameTaken { .. })
    }

    /// Check if this error is related to I/O or (de)serialization.
    pub fn is_io_error(&self) -> bool {
        matches!(
            self,
            BackendError::FileIo { .. }
                | BackendError::SerializationFailed { .. }
                | BackendError::DeserializationFailed { .. }
        )
    }

    /// Check if stored data failed to map back to the model.
    pub fn is_integrity_error(&self) -> bool {
        matches!(self, BackendError::CorruptRow { .. })
    }
}

impl From<BackendError> for crate::Error {
    fn from(err: BackendError) -> Self {
        crate::Error::Backend(err)
    }
}
