//! Keyed mutual exclusion
//!
//! The [`LockService`] hands out process-wide locks identified by a
//! [`LockKey`], a resource class plus the user it applies to. Locks for
//! different keys never contend. Locks for the same key are strictly
//! serialized; waiters queue on a tokio mutex, which wakes them in arrival
//! order so a busy key cannot starve a waiter.
//!
//! The lock table maps each key to a reference-counted mutex. Entries are
//! created on first use and removed as soon as no holder or waiter
//! references them, so the table only ever holds keys that are in use.
//!
//! Locks are not reentrant: acquiring a key that the current task already
//! holds waits forever, or until the configured acquire timeout.

mod errors;

use std::{
    collections::HashMap,
    fmt,
    future::Future,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex as KeyMutex, OwnedMutexGuard};
use tracing::debug;

pub use errors::LockError;

use crate::{Result, UserId};

/// The kind of resource a lock protects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LockClass {
    /// A user's upload directory
    UserFiles,
    /// Recomputation of a user's cached submission counters
    SubmitRefresh,
    /// Removal of an account and its cache entry
    AccountLifecycle,
}

impl LockClass {
    fn as_str(&self) -> &'static str {
        match self {
            LockClass::UserFiles => "user-files",
            LockClass::SubmitRefresh => "submit-refresh",
            LockClass::AccountLifecycle => "account-lifecycle",
        }
    }
}

/// Composite key identifying one lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LockKey {
    pub class: LockClass,
    pub user_id: UserId,
}

impl LockKey {
    pub fn new(class: LockClass, user_id: UserId) -> Self {
        Self { class, user_id }
    }

    /// Key guarding a user's upload directory.
    pub fn user_files(user_id: UserId) -> Self {
        Self::new(LockClass::UserFiles, user_id)
    }

    /// Key guarding a user's counter refresh.
    pub fn submit_refresh(user_id: UserId) -> Self {
        Self::new(LockClass::SubmitRefresh, user_id)
    }

    /// Key guarding account deletion and cache population.
    pub fn account_lifecycle(user_id: UserId) -> Self {
        Self::new(LockClass::AccountLifecycle, user_id)
    }
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.class.as_str(), self.user_id)
    }
}

/// Lock service settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockConfig {
    /// Upper bound on waiting for a lock, in milliseconds. `None` waits forever.
    #[serde(default)]
    pub acquire_timeout_ms: Option<u64>,
}

impl LockConfig {
    /// Config with the given acquire timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            acquire_timeout_ms: Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)),
        }
    }

    pub fn acquire_timeout(&self) -> Option<Duration> {
        self.acquire_timeout_ms.map(Duration::from_millis)
    }
}

type LockTable = Mutex<HashMap<LockKey, Arc<KeyMutex<()>>>>;

/// Registration of one holder or waiter of a key.
///
/// Holders and waiters keep the key's mutex alive through their own `Arc`
/// (inside the pending lock future or the acquired guard). Those are always
/// dropped before the slot, so when the slot finds the table's reference
/// to be the only one left, nobody is using the key and the entry goes.
struct Slot {
    table: Arc<LockTable>,
    key: LockKey,
}

impl Slot {
    fn checkout(table: &Arc<LockTable>, key: LockKey) -> (Self, Arc<KeyMutex<()>>) {
        let mut entries = table.lock().unwrap_or_else(PoisonError::into_inner);
        let mutex = Arc::clone(entries.entry(key).or_default());
        let slot = Self {
            table: Arc::clone(table),
            key,
        };
        (slot, mutex)
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        let mut entries = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        // New references are only handed out under the table lock.
        if entries
            .get(&self.key)
            .is_some_and(|mutex| Arc::strong_count(mutex) == 1)
        {
            entries.remove(&self.key);
        }
    }
}

/// Proof of holding a keyed lock. The lock is released on drop.
pub struct KeyGuard {
    // Field order matters: the mutex is unlocked before the slot is released.
    _guard: OwnedMutexGuard<()>,
    slot: Slot,
}

impl KeyGuard {
    /// The key this guard holds.
    pub fn key(&self) -> &LockKey {
        &self.slot.key
    }
}

impl fmt::Debug for KeyGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyGuard").field("key", &self.slot.key).finish()
    }
}

/// Process-wide keyed lock table.
///
/// Cheap to clone; clones share the same table.
#[derive(Clone)]
pub struct LockService {
    table: Arc<LockTable>,
    config: LockConfig,
}

impl LockService {
    pub fn new(config: LockConfig) -> Self {
        Self {
            table: Arc::new(Mutex::new(HashMap::new())),
            config,
        }
    }

    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    /// Acquire the lock for `key`, waiting up to the configured timeout.
    pub async fn lock(&self, key: LockKey) -> Result<KeyGuard> {
        let (slot, mutex) = Slot::checkout(&self.table, key);

        debug!(%key, "Waiting for lock");
        let guard = match self.config.acquire_timeout() {
            Some(limit) => match tokio::time::timeout(limit, mutex.lock_owned()).await {
                Ok(guard) => guard,
                Err(_) => {
                    debug!(%key, ?limit, "Lock acquire timed out");
                    return Err(LockError::Timeout { key, waited: limit }.into());
                }
            },
            None => mutex.lock_owned().await,
        };
        debug!(%key, "Lock acquired");

        Ok(KeyGuard {
            _guard: guard,
            slot,
        })
    }

    /// Run `f` while holding the lock for `key`.
    ///
    /// The lock is released on every exit path: normal return, an error
    /// from `f`, a panic inside `f`, or the returned future being dropped.
    pub async fn with_lock<F, Fut, T>(&self, key: LockKey, f: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let _guard = self.lock(key).await?;
        f().await
    }

    /// Number of keys currently held or waited on.
    pub fn active_keys(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for LockService {
    fn default() -> Self {
        Self::new(LockConfig::default())
    }
}

impl fmt::Debug for LockService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockService")
            .field("active_keys", &self.active_keys())
            .field("config", &self.config)
            .finish()
    }
}
