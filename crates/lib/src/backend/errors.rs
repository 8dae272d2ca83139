//! Backend error types for Roster persistence.
//!
//! This module defines structured error types for persistence operations,
//! providing better error context and type safety compared to string-based errors.

use thiserror::Error;

use crate::UserId;

/// Errors that can occur during persistence operations.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Existing variants will not be removed in minor versions
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum BackendError {
    /// Account not found by id.
    #[error("Account not found: {id}")]
    AccountNotFound {
        /// The id of the account that was not found
        id: UserId,
    },

    /// Another account already uses this username.
    #[error("Username already exists: {username}")]
    UsernameTaken {
        /// The conflicting username
        username: String,
    },

    /// Grant not found for removal.
    #[error("Privilege '{privilege}' is not granted to user {user_id}")]
    GrantNotFound {
        /// The user the grant was expected on
        user_id: UserId,
        /// The privilege name
        privilege: String,
    },

    /// Grant already exists.
    #[error("Privilege '{privilege}' is already granted to user {user_id}")]
    DuplicateGrant {
        /// The user holding the grant
        user_id: UserId,
        /// The privilege name
        privilege: String,
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

    /// Stored data violates an invariant the backend relies on.
    #[error("Backend state inconsistency: {reason}")]
    StateInconsistency {
        /// Description of the state inconsistency
        reason: String,
    },

    /// SQL database error.
    #[cfg(any(feature = "sqlite", feature = "postgres"))]
    #[error("SQL error: {reason}")]
    SqlxError {
        /// Context message
        reason: String,
        /// The underlying sqlx error, if any
        #[source]
        source: Option<sqlx::Error>,
    },
}

impl BackendError {
    /// Check if this error indicates a resource was not found.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            BackendError::AccountNotFound { .. } | BackendError::GrantNotFound { .. }
        )
    }

    /// Check if this error indicates a uniqueness violation.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            BackendError::UsernameTaken { .. } | BackendError::DuplicateGrant { .. }
        )
    }

    /// Check if this error is related to I/O operations.
    pub fn is_io_error(&self) -> bool {
        matches!(
            self,
            BackendError::FileIo { .. }
                | BackendError::SerializationFailed { .. }
                | BackendError::DeserializationFailed { .. }
        )
    }

    /// Get the user id if this error is about a specific account.
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            BackendError::AccountNotFound { id } => Some(*id),
            BackendError::GrantNotFound { user_id, .. }
            | BackendError::DuplicateGrant { user_id, .. } => Some(*user_id),
            _ => None,
        }
    }
}

// Conversion from BackendError to the main Error type
impl From<BackendError> for crate::Error {
    fn from(err: BackendError) -> Self {
        crate::Error::Backend(err)
    }
}
