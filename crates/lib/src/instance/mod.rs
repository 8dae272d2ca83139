//! The [`Instance`] handle wiring the managers to their collaborators.
//!
//! An `Instance` owns one persistence backend, one account cache, one file
//! store, one lock service and the configuration. Managers handed out by
//! it share those, so locks taken through one manager exclude operations
//! started through any other manager of the same instance (or its clones).

use std::{fmt, sync::Arc};

use handle_trait::Handle;

use crate::{
    Config,
    account::AccountManager,
    backend::BackendImpl,
    cache::{AccountCache, InMemoryCache},
    files::FileManager,
    lock::LockService,
    privileges::PrivilegeManager,
    stats::StatsAggregator,
    storage::{FileStore, LocalFileStore},
};

/// Internal state for Instance
///
/// Instance itself is just a cheap-to-clone handle wrapping Arc<InstanceInternal>.
pub(crate) struct InstanceInternal {
    backend: Arc<dyn BackendImpl>,
    cache: Arc<dyn AccountCache>,
    store: Arc<dyn FileStore>,
    locks: LockService,
    config: Arc<Config>,
}

impl fmt::Debug for InstanceInternal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceInternal")
            .field("backend", &"<BackendImpl>")
            .field("cache", &"<AccountCache>")
            .field("store", &"<FileStore>")
            .field("locks", &self.locks)
            .field("config", &self.config)
            .finish()
    }
}

/// Entry point to the library.
///
/// ## Example
///
/// ```
/// # use roster::{backend::database::InMemory, Config, Instance, UserAccount};
/// # #[tokio::main]
/// # async fn main() -> roster::Result<()> {
/// let instance = Instance::open(Box::new(InMemory::new()), Config::default());
///
/// let alice = instance
///     .accounts()
///     .create_account(UserAccount::new("alice"))
///     .await?;
/// instance
///     .privileges()
///     .set_privileges(alice.id, ["judge"])
///     .await?;
/// assert!(instance.privileges().has_privilege(alice.id, "judge").await?);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Handle)]
pub struct Instance {
    inner: Arc<InstanceInternal>,
}

impl Instance {
    /// Create an instance over `backend` with an in-process account cache
    /// and the local filesystem as file store.
    pub fn open(backend: Box<dyn BackendImpl>, config: Config) -> Self {
        let store = LocalFileStore::new(config.normalizer.clone());
        Self::with_collaborators(
            Arc::from(backend),
            Arc::new(InMemoryCache::new()),
            Arc::new(store),
            config,
        )
    }

    /// Create an instance from explicitly chosen collaborators.
    pub fn with_collaborators(
        backend: Arc<dyn BackendImpl>,
        cache: Arc<dyn AccountCache>,
        store: Arc<dyn FileStore>,
        config: Config,
    ) -> Self {
        let locks = LockService::new(config.lock.clone());
        Self {
            inner: Arc::new(InstanceInternal {
                backend,
                cache,
                store,
                locks,
                config: Arc::new(config),
            }),
        }
    }

    pub fn backend(&self) -> &Arc<dyn BackendImpl> {
        &self.inner.backend
    }

    pub fn cache(&self) -> &Arc<dyn AccountCache> {
        &self.inner.cache
    }

    pub fn locks(&self) -> &LockService {
        &self.inner.locks
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Per-user upload management.
    pub fn files(&self) -> FileManager {
        FileManager::new(
            Arc::clone(&self.inner.backend),
            Arc::clone(&self.inner.store),
            self.inner.locks.clone(),
            Arc::clone(&self.inner.config),
        )
    }

    pub fn privileges(&self) -> PrivilegeManager {
        PrivilegeManager::new(Arc::clone(&self.inner.backend))
    }

    pub fn stats(&self) -> StatsAggregator {
        StatsAggregator::new(
            Arc::clone(&self.inner.backend),
            Arc::clone(&self.inner.cache),
            self.inner.locks.clone(),
        )
    }

    pub fn accounts(&self) -> AccountManager {
        AccountManager::new(
            Arc::clone(&self.inner.backend),
            Arc::clone(&self.inner.cache),
            self.inner.locks.clone(),
        )
    }
}
