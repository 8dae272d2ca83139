//! Error types for per-user file management
use std::path::PathBuf;

use thiserror::Error;

use crate::UserId;

/// Errors that can occur during file operations.
#[derive(Error, Debug)]
pub enum FileError {
    /// Underlying storage failed.
    #[error("Storage unavailable: {operation} {path:?}")]
    StorageUnavailable {
        /// What was being attempted (for example `"move"`)
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Filename is not a single plain path component.
    #[error("Invalid filename: {filename:?}")]
    InvalidFilename { filename: String },

    /// The upload would exceed the configured per-user quota.
    #[error("Upload quota exceeded for user {user_id}: {reason}")]
    QuotaExceeded { user_id: UserId, reason: String },

    /// The line-ending normalizer reported a failure.
    #[error("Normalization of {path:?} failed: {reason}")]
    NormalizationFailed { path: PathBuf, reason: String },
}

impl FileError {
    /// Check if this error came from the storage layer.
    pub fn is_storage_error(&self) -> bool {
        matches!(self, FileError::StorageUnavailable { .. })
    }

    /// Check if this error is a rejected upload due to quota limits.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, FileError::QuotaExceeded { .. })
    }

    /// Check if this error is a rejected filename.
    pub fn is_invalid_filename(&self) -> bool {
        matches!(self, FileError::InvalidFilename { .. })
    }

    pub(crate) fn storage(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        FileError::StorageUnavailable {
            operation,
            path: path.into(),
            source,
        }
    }
}

impl From<FileError> for crate::Error {
    fn from(err: FileError) -> Self {
        crate::Error::Files(err)
    }
}
