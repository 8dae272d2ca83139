//! Read-through cache of account rows.
//!
//! The cache is a collaborator of the account manager: lookups by id are
//! served from it when possible and destroying an account always evicts
//! its entry. Implementations only need to be safe for concurrent use; the
//! ordering between cache and backend is the account manager's concern.

use std::{any::Any, collections::HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{Result, UserAccount, UserId};

/// Keyed cache of account rows.
#[async_trait]
pub trait AccountCache: Send + Sync + Any {
    /// Look up a cached account.
    async fn get(&self, id: UserId) -> Result<Option<UserAccount>>;

    /// Insert or replace an entry.
    async fn put(&self, account: UserAccount) -> Result<()>;

    /// Drop an entry. Evicting an absent entry succeeds.
    async fn evict(&self, id: UserId) -> Result<()>;

    fn as_any(&self) -> &dyn Any;
}

/// Process-local cache backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<UserId, UserAccount>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Whether an entry for `id` is present.
    pub async fn contains(&self, id: UserId) -> bool {
        self.entries.read().await.contains_key(&id)
    }
}

#[async_trait]
impl AccountCache for InMemoryCache {
    async fn get(&self, id: UserId) -> Result<Option<UserAccount>> {
        Ok(self.entries.read().await.get(&id).cloned())
    }

    async fn put(&self, account: UserAccount) -> Result<()> {
        self.entries.write().await.insert(account.id, account);
        Ok(())
    }

    async fn evict(&self, id: UserId) -> Result<()> {
        self.entries.write().await.remove(&id);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
