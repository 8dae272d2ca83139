//! Error types for privilege reconciliation
use thiserror::Error;

use crate::UserId;

/// Errors that can occur while reconciling privileges.
#[derive(Error, Debug)]
pub enum PrivilegeError {
    /// A grant that the diff expected to remove was not stored.
    ///
    /// Raised when the stored set changed between reading it and applying
    /// the removals.
    #[error("Privilege '{privilege}' disappeared from user {user_id} during reconciliation")]
    GrantNotFound { user_id: UserId, privilege: String },
}

impl PrivilegeError {
    /// Check if this error indicates a missing grant.
    pub fn is_not_found(&self) -> bool {
        matches!(self, PrivilegeError::GrantNotFound { .. })
    }
}

impl From<PrivilegeError> for crate::Error {
    fn from(err: PrivilegeError) -> Self {
        crate::Error::Privilege(err)
    }
}
