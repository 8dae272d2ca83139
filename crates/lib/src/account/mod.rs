//! Account lifecycle: cache-aware reads, writes and deletion.
//!
//! Every operation that can put a row into the cache, and account
//! deletion itself, runs under the `(AccountLifecycle, user_id)` lock.
//! A reader therefore cannot refill the cache from a row that is being
//! deleted, and once [`AccountManager::destroy`] returns neither the
//! cache nor the backend still produces the account.

use std::{fmt, sync::Arc};

use tracing::{debug, info, warn};

use crate::{
    Result, UserAccount, UserId,
    backend::BackendImpl,
    cache::AccountCache,
    constants::upload_tag,
    lock::{LockKey, LockService},
    types::FileRecord,
};

#[derive(Clone)]
pub struct AccountManager {
    backend: Arc<dyn BackendImpl>,
    cache: Arc<dyn AccountCache>,
    locks: LockService,
}

impl fmt::Debug for AccountManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountManager")
            .field("locks", &self.locks)
            .finish_non_exhaustive()
    }
}

impl AccountManager {
    pub fn new(
        backend: Arc<dyn BackendImpl>,
        cache: Arc<dyn AccountCache>,
        locks: LockService,
    ) -> Self {
        Self {
            backend,
            cache,
            locks,
        }
    }

    /// Create a new account; the backend assigns its id.
    pub async fn create_account(&self, account: UserAccount) -> Result<UserAccount> {
        let account = self.backend.create_account(account).await?;
        info!(user_id = account.id, username = ?account.username, "Created account");
        Ok(account)
    }

    /// Load an account, reading through the cache.
    pub async fn get_account(&self, user_id: UserId) -> Result<UserAccount> {
        if let Some(account) = self.cache.get(user_id).await? {
            return Ok(account);
        }

        let _guard = self.locks.lock(LockKey::account_lifecycle(user_id)).await?;
        // Another reader may have filled the entry while we waited
        if let Some(account) = self.cache.get(user_id).await? {
            return Ok(account);
        }

        let account = self.backend.get_account(user_id).await?;
        self.cache.put(account.clone()).await?;
        debug!(user_id, "Cached account");
        Ok(account)
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<UserAccount>> {
        self.backend.find_account_by_username(username).await
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>> {
        self.backend.find_account_by_email(email).await
    }

    /// Persist an account and refresh its cache entry.
    pub async fn save_account(&self, account: &UserAccount) -> Result<()> {
        let _guard = self
            .locks
            .lock(LockKey::account_lifecycle(account.id))
            .await?;
        self.backend.save_account(account).await?;
        self.cache.put(account.clone()).await
    }

    /// Tracking records of every file the account uploaded.
    pub async fn load_relationships(&self, user_id: UserId) -> Result<Vec<FileRecord>> {
        self.backend.list_file_records(&upload_tag(user_id)).await
    }

    /// Delete the account row, then evict its cache entry.
    ///
    /// The eviction is attempted even when the row is already gone; in that
    /// case the backend's not-found error is returned afterwards.
    pub async fn destroy(&self, user_id: UserId) -> Result<()> {
        let _guard = self.locks.lock(LockKey::account_lifecycle(user_id)).await?;

        let removed = self.backend.remove_account(user_id).await;
        let evicted = self.cache.evict(user_id).await;

        match (removed, evicted) {
            (Ok(()), Ok(())) => {
                info!(user_id, "Destroyed account");
                Ok(())
            }
            (Err(e), _) => {
                warn!(user_id, error = %e, "Account row could not be removed");
                Err(e)
            }
            (Ok(()), Err(e)) => Err(e),
        }
    }
}
