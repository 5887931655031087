//! Query argument errors.

use thiserror::Error;

/// Invalid arguments supplied to a read operation.
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Sort order string is not one of `oldest`, `newest`, `index`.
    #[error("Unsupported sort order: {value:?}")]
    UnknownSortOrder {
        /// The rejected input
        value: String,
    },

    /// Timestamp string is not a decimal number of seconds.
    #[error("Invalid timestamp: {value:?}")]
    InvalidTimestamp {
        /// The rejected input
        value: String,
    },
}

impl QueryError {
    /// All query errors are caller mistakes.
    pub fn is_invalid_argument(&self) -> bool {
        true
    }
}

impl From<QueryError> for crate::Error {
    fn from(err: QueryError) -> Self {
        crate::Error::Query(err)
    }
}
