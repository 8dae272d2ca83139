//!
//! Roster: per-user resource coordination for a multi-user judging platform.
//!
//! The crate owns the parts of a user account that change under concurrent
//! access and need real invariants:
//!
//! * **Lock service (`lock::LockService`)**: process-wide keyed mutual exclusion.
//!   Every lock is scoped to a `(LockClass, UserId)` pair.
//! * **File manager (`files::FileManager`)**: per-user upload directory with
//!   serialized upload/delete, lock-free listing and best-effort line-ending
//!   normalization.
//! * **Privilege reconciler (`privileges::PrivilegeManager`)**: minimal
//!   add/remove diff between stored and requested privilege sets.
//! * **Statistics (`stats::StatsAggregator`)**: accepted/submitted counters,
//!   the per-status histogram and the last used language, derived from the
//!   submission log.
//! * **Account lifecycle (`account::AccountManager`)**: cache-aware reads and
//!   ordered account deletion.
//!
//! Persistence (`backend::BackendImpl`), caching (`cache::AccountCache`) and
//! file storage (`storage::FileStore`) are pluggable collaborators. The
//! [`Instance`] handle wires them together.

pub mod account;
pub mod backend;
pub mod cache;
pub mod config;
pub mod constants;
pub mod files;
pub mod instance;
pub mod lock;
pub mod privileges;
pub mod stats;
pub mod storage;
pub mod types;

pub use config::Config;
pub use instance::Instance;
pub use types::{ProblemId, UserAccount, UserId};

/// Result type used throughout the Roster library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the Roster library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured lock errors from the lock module
    #[error(transparent)]
    Lock(lock::LockError),

    /// Structured persistence errors from the backend module
    #[error(transparent)]
    Backend(backend::BackendError),

    /// Structured file errors from the files module
    #[error(transparent)]
    Files(files::FileError),

    /// Structured privilege errors from the privileges module
    #[error(transparent)]
    Privilege(privileges::PrivilegeError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Lock(_) => "lock",
            Error::Backend(_) => "backend",
            Error::Files(_) => "files",
            Error::Privilege(_) => "privileges",
            Error::Io(_) => "io",
            Error::Serialize(_) => "serialize",
        }
    }

    /// Check if this error indicates a resource was not found.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Backend(backend_err) => backend_err.is_not_found(),
            Error::Privilege(privilege_err) => privilege_err.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error indicates a lock acquisition timed out.
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::Lock(lock_err) => lock_err.is_timeout(),
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

    /// Check if this error came from file storage.
    pub fn is_storage_error(&self) -> bool {
        match self {
            Error::Io(_) => true,
            Error::Files(file_err) => file_err.is_storage_error(),
            _ => false,
        }
    }

    /// Check if this error is a passthrough from the persistence layer.
    pub fn is_persistence_error(&self) -> bool {
        matches!(self, Error::Backend(_))
    }

    /// Check if this error is a rejected upload due to quota limits.
    pub fn is_quota_exceeded(&self) -> bool {
        match self {
            Error::Files(file_err) => file_err.is_quota_exceeded(),
            _ => false,
        }
    }
}
