//! Reaper error types.

use thiserror::Error;

/// Errors raised when talking to the background reaper.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ReaperError {
    /// The reaper task has exited and no longer accepts commands.
    #[error("Reaper task is not running")]
    Stopped,

    /// The reaper task panicked or was cancelled.
    #[error("Reaper task failed: {reason}")]
    TaskFailed {
        /// Description of the join failure
        reason: String,
    },
}

impl ReaperError {
    /// Check if the reaper is no longer available.
    pub fn is_stopped(&self) -> bool {
        matches!(self, ReaperError::Stopped | ReaperError::TaskFailed { .. })
    }
}

impl From<ReaperError> for crate::Error {
    fn from(err: ReaperError) -> Self {
        crate::Error::Reaper(err)
    }
}
