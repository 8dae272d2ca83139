//! In-memory database backend implementation
//!
//! This module provides an in-memory implementation of the `BackendImpl`
//! trait, suitable for testing, development, or small deployments where
//! the whole state can be saved to and loaded from a JSON file.

mod persistence;

use std::{
    any::Any,
    collections::{BTreeMap, BTreeSet},
    path::Path,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use crate::{
    Result,
    backend::{BackendImpl, errors::BackendError},
    types::{
        FileRecord, PrivilegeGrant, ProblemId, SubmissionFilter, SubmissionRecord, UserAccount,
        UserId,
    },
};

/// Last assigned id per table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Sequences {
    pub(crate) account: i64,
    pub(crate) submission: i64,
    pub(crate) file: i64,
}

/// Tracking records keyed by (tag, filename).
pub(crate) type FileRecordMap = BTreeMap<(String, String), FileRecord>;

/// A simple in-memory backend using ordered maps for storage.
///
/// Every table sits behind its own `RwLock`, so readers of one table never
/// wait on writers of another. Uniqueness constraints are checked under
/// the write lock of the owning table.
///
/// It provides basic persistence capabilities via `save_to_file` and
/// `load_from_file`, serializing the full state to JSON.
#[derive(Debug, Default)]
pub struct InMemory {
    pub(crate) accounts: RwLock<BTreeMap<UserId, UserAccount>>,
    pub(crate) grants: RwLock<BTreeSet<PrivilegeGrant>>,
    pub(crate) submissions: RwLock<Vec<SubmissionRecord>>,
    pub(crate) file_records: RwLock<FileRecordMap>,
    pub(crate) sequences: Mutex<Sequences>,
}

impl InMemory {
    /// Creates a new, empty `InMemory` backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored accounts.
    pub async fn account_count(&self) -> usize {
        self.accounts.read().await.len()
    }

    /// Saves the entire backend state to a specified file as JSON.
    ///
    /// # Arguments
    /// * `path` - The path to the file where the state should be saved.
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        persistence::save_to_file(self, path).await
    }

    /// Loads the backend state from a specified JSON file.
    ///
    /// If the file does not exist, a new, empty `InMemory` backend is returned.
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        persistence::load_from_file(path).await
    }
}

fn username_taken(
    accounts: &BTreeMap<UserId, UserAccount>,
    username: Option<&str>,
    except: UserId,
) -> bool {
    username.is_some_and(|name| {
        accounts
            .values()
            .any(|a| a.id != except && a.username.as_deref() == Some(name))
    })
}

#[async_trait]
impl BackendImpl for InMemory {
    async fn get_account(&self, id: UserId) -> Result<UserAccount> {
        let accounts = self.accounts.read().await;
        accounts
            .get(&id)
            .cloned()
            .ok_or_else(|| BackendError::AccountNotFound { id }.into())
    }

    async fn find_account_by_username(&self, username: &str) -> Result<Option<UserAccount>> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .find(|a| a.username.as_deref() == Some(username))
            .cloned())
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<UserAccount>> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .find(|a| a.email.as_deref() == Some(email))
            .cloned())
    }

    async fn create_account(&self, mut account: UserAccount) -> Result<UserAccount> {
        let mut accounts = self.accounts.write().await;
        if username_taken(&accounts, account.username.as_deref(), 0) {
            return Err(BackendError::UsernameTaken {
                username: account.username.unwrap_or_default(),
            }
            .into());
        }

        let mut sequences = self.sequences.lock().await;
        sequences.account += 1;
        account.id = sequences.account;
        accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn save_account(&self, account: &UserAccount) -> Result<()> {
        let mut accounts = self.accounts.write().await;
        if !accounts.contains_key(&account.id) {
            return Err(BackendError::AccountNotFound { id: account.id }.into());
        }
        if username_taken(&accounts, account.username.as_deref(), account.id) {
            return Err(BackendError::UsernameTaken {
                username: account.username.clone().unwrap_or_default(),
            }
            .into());
        }
        accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn remove_account(&self, id: UserId) -> Result<()> {
        let mut accounts = self.accounts.write().await;
        match accounts.remove(&id) {
            Some(_) => Ok(()),
            None => Err(BackendError::AccountNotFound { id }.into()),
        }
    }

    async fn list_grants(&self, user_id: UserId) -> Result<Vec<PrivilegeGrant>> {
        let grants = self.grants.read().await;
        Ok(grants
            .iter()
            .filter(|g| g.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_grant(
        &self,
        user_id: UserId,
        privilege: &str,
    ) -> Result<Option<PrivilegeGrant>> {
        let grants = self.grants.read().await;
        Ok(grants
            .iter()
            .find(|g| g.user_id == user_id && g.privilege == privilege)
            .cloned())
    }

    async fn create_grant(&self, user_id: UserId, privilege: &str) -> Result<PrivilegeGrant> {
        let grant = PrivilegeGrant {
            user_id,
            privilege: privilege.to_string(),
        };
        let mut grants = self.grants.write().await;
        if !grants.insert(grant.clone()) {
            return Err(BackendError::DuplicateGrant {
                user_id,
                privilege: privilege.to_string(),
            }
            .into());
        }
        Ok(grant)
    }

    async fn remove_grant(&self, grant: &PrivilegeGrant) -> Result<()> {
        let mut grants = self.grants.write().await;
        if !grants.remove(grant) {
            return Err(BackendError::GrantNotFound {
                user_id: grant.user_id,
                privilege: grant.privilege.clone(),
            }
            .into());
        }
        Ok(())
    }

    async fn insert_submission(&self, mut record: SubmissionRecord) -> Result<SubmissionRecord> {
        let mut submissions = self.submissions.write().await;
        let mut sequences = self.sequences.lock().await;
        sequences.submission += 1;
        record.id = sequences.submission;
        submissions.push(record.clone());
        Ok(record)
    }

    async fn count_submissions(&self, filter: &SubmissionFilter) -> Result<u64> {
        let submissions = self.submissions.read().await;
        Ok(submissions.iter().filter(|s| filter.matches(s)).count() as u64)
    }

    async fn count_distinct_problems(&self, filter: &SubmissionFilter) -> Result<u64> {
        Ok(self.distinct_problem_ids(filter).await?.len() as u64)
    }

    async fn distinct_problem_ids(&self, filter: &SubmissionFilter) -> Result<Vec<ProblemId>> {
        let submissions = self.submissions.read().await;
        let ids: BTreeSet<ProblemId> = submissions
            .iter()
            .filter(|s| filter.matches(s))
            .map(|s| s.problem_id)
            .collect();
        Ok(ids.into_iter().collect())
    }

    async fn latest_submission(&self, user_id: UserId) -> Result<Option<SubmissionRecord>> {
        let submissions = self.submissions.read().await;
        Ok(submissions
            .iter()
            .filter(|s| s.user_id == user_id)
            .max_by_key(|s| (s.submit_time, s.id))
            .cloned())
    }

    async fn list_file_records(&self, tag: &str) -> Result<Vec<FileRecord>> {
        let records = self.file_records.read().await;
        Ok(records
            .values()
            .filter(|r| r.tag == tag)
            .cloned()
            .collect())
    }

    async fn upsert_file_record(
        &self,
        tag: &str,
        filename: &str,
        size: u64,
    ) -> Result<FileRecord> {
        let mut records = self.file_records.write().await;
        let key = (tag.to_string(), filename.to_string());
        if let Some(existing) = records.get_mut(&key) {
            existing.size = size;
            return Ok(existing.clone());
        }

        let mut sequences = self.sequences.lock().await;
        sequences.file += 1;
        let record = FileRecord {
            id: sequences.file,
            tag: tag.to_string(),
            filename: filename.to_string(),
            size,
        };
        records.insert(key, record.clone());
        Ok(record)
    }

    async fn remove_file_record(&self, tag: &str, filename: &str) -> Result<bool> {
        let mut records = self.file_records.write().await;
        Ok(records
            .remove(&(tag.to_string(), filename.to_string()))
            .is_some())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
