//! Backend implementations for Roster persistence
//!
//! This module provides the core `BackendImpl` trait and its implementations
//! organized by category (currently only database-style backends).
//!
//! The `BackendImpl` trait is the relational collaborator of the core: it
//! stores accounts, privilege grants and file tracking records, and answers
//! read-only queries over the submission log. It deliberately knows nothing
//! about locking, reconciliation or statistics; those live in the managers
//! that call it.

use std::any::Any;

use async_trait::async_trait;

use crate::Result;
use crate::types::{
    FileRecord, PrivilegeGrant, ProblemId, SubmissionFilter, SubmissionRecord, UserAccount,
    UserId,
};

pub mod database;
pub mod errors;

pub use errors::BackendError;

/// Persistence trait abstracting the underlying storage mechanism.
///
/// All backend implementations must be `Send` and `Sync` to allow sharing
/// across tasks, and implement `Any` to allow downcasting (the CLI uses this
/// to save an `InMemory` backend on shutdown).
///
/// ## Uniqueness
///
/// Implementations enforce two uniqueness constraints: one account per
/// username, and one grant per (user, privilege). Violations surface as
/// [`BackendError::UsernameTaken`] and [`BackendError::DuplicateGrant`].
#[async_trait]
pub trait BackendImpl: Send + Sync + Any {
    // === Accounts ===

    /// Retrieves an account by id.
    ///
    /// # Returns
    /// The account, or `BackendError::AccountNotFound`.
    async fn get_account(&self, id: UserId) -> Result<UserAccount>;

    /// Looks up an account by its unique username.
    async fn find_account_by_username(&self, username: &str) -> Result<Option<UserAccount>>;

    /// Looks up the first account registered with `email`.
    async fn find_account_by_email(&self, email: &str) -> Result<Option<UserAccount>>;

    /// Inserts a new account, ignoring `account.id`.
    ///
    /// # Returns
    /// The stored account with its assigned id.
    async fn create_account(&self, account: UserAccount) -> Result<UserAccount>;

    /// Overwrites an existing account row.
    ///
    /// Fails with `BackendError::AccountNotFound` if the row does not exist.
    async fn save_account(&self, account: &UserAccount) -> Result<()>;

    /// Deletes an account row.
    ///
    /// Only the row itself is removed; grants, submissions and file
    /// records referencing the id are left alone.
    async fn remove_account(&self, id: UserId) -> Result<()>;

    // === Privilege grants ===

    /// Lists every grant held by `user_id`, in no particular order.
    async fn list_grants(&self, user_id: UserId) -> Result<Vec<PrivilegeGrant>>;

    /// Finds a single grant.
    async fn find_grant(&self, user_id: UserId, privilege: &str)
    -> Result<Option<PrivilegeGrant>>;

    /// Creates a grant, failing with `BackendError::DuplicateGrant` if it exists.
    async fn create_grant(&self, user_id: UserId, privilege: &str) -> Result<PrivilegeGrant>;

    /// Removes a grant, failing with `BackendError::GrantNotFound` if absent.
    async fn remove_grant(&self, grant: &PrivilegeGrant) -> Result<()>;

    // === Submission log ===

    /// Appends a submission to the log, ignoring `record.id`.
    ///
    /// This is the judge's write path; the core never calls it.
    async fn insert_submission(&self, record: SubmissionRecord) -> Result<SubmissionRecord>;

    /// Counts submissions matching `filter`.
    async fn count_submissions(&self, filter: &SubmissionFilter) -> Result<u64>;

    /// Counts distinct problem ids among submissions matching `filter`.
    async fn count_distinct_problems(&self, filter: &SubmissionFilter) -> Result<u64>;

    /// Distinct problem ids among submissions matching `filter`, ascending.
    async fn distinct_problem_ids(&self, filter: &SubmissionFilter) -> Result<Vec<ProblemId>>;

    /// The user's most recent submission by submit time.
    ///
    /// Submissions with equal submit times are ordered by id, newest first.
    async fn latest_submission(&self, user_id: UserId) -> Result<Option<SubmissionRecord>>;

    // === File tracking records ===

    /// Lists tracking records carrying `tag`, ordered by filename.
    async fn list_file_records(&self, tag: &str) -> Result<Vec<FileRecord>>;

    /// Creates or updates the record for (`tag`, `filename`).
    async fn upsert_file_record(&self, tag: &str, filename: &str, size: u64)
    -> Result<FileRecord>;

    /// Removes the record for (`tag`, `filename`).
    ///
    /// # Returns
    /// Whether a record was removed.
    async fn remove_file_record(&self, tag: &str, filename: &str) -> Result<bool>;

    /// Returns a reference to the backend as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;
}
