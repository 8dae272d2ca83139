//! Error types for the lock service
use std::time::Duration;

use thiserror::Error;

use super::LockKey;

/// Errors that can occur while acquiring a keyed lock.
#[derive(Error, Debug)]
pub enum LockError {
    /// The lock was not acquired within the configured bound.
    #[error("Timed out after {waited:?} waiting for lock {key}")]
    Timeout {
        /// The contended key
        key: LockKey,
        /// How long the caller waited
        waited: Duration,
    },
}

impl LockError {
    /// Check if this error is an acquire timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, LockError::Timeout { .. })
    }

    /// The key this error refers to.
    pub fn key(&self) -> &LockKey {
        match self {
            LockError::Timeout { key, .. } => key,
        }
    }
}

impl From<LockError> for crate::Error {
    fn from(err: LockError) -> Self {
        crate::Error::Lock(err)
    }
}
