use std::{
    any::Any,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use roster::{
    Instance, Result, UserAccount, UserId,
    backend::BackendImpl,
    cache::{AccountCache, InMemoryCache},
    constants::SUBMISSION_TYPE_NORMAL,
    storage::LocalFileStore,
};
use tokio::sync::Notify;

use crate::helpers::{create_user, stage_file, submit, test_backend, test_config, test_instance};

/// Instance with a cache handle the test can inspect.
async fn instance_with_cache() -> (Instance, Arc<InMemoryCache>, tempfile::TempDir) {
    let (config, dir) = test_config();
    let cache = Arc::new(InMemoryCache::new());
    let instance = Instance::with_collaborators(
        Arc::from(test_backend().await),
        cache.clone(),
        Arc::new(LocalFileStore::default()),
        config,
    );
    (instance, cache, dir)
}

/// Cache whose next `put` pauses until released.
#[derive(Default)]
struct GatedCache {
    inner: InMemoryCache,
    armed: AtomicBool,
    reached: Notify,
    release: Notify,
}

impl GatedCache {
    fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl AccountCache for GatedCache {
    async fn get(&self, id: UserId) -> Result<Option<UserAccount>> {
        self.inner.get(id).await
    }

    async fn put(&self, account: UserAccount) -> Result<()> {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.reached.notify_one();
            self.release.notified().await;
        }
        self.inner.put(account).await
    }

    async fn evict(&self, id: UserId) -> Result<()> {
        self.inner.evict(id).await
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[tokio::test]
async fn test_get_account_reads_through_cache() {
    let (instance, cache, _dir) = instance_with_cache().await;
    let user = create_user(&instance, "alice").await;
    assert!(!cache.contains(user.id).await);

    let loaded = instance.accounts().get_account(user.id).await.unwrap();
    assert_eq!(loaded, user);
    assert!(cache.contains(user.id).await);
}

#[tokio::test]
async fn test_destroy_then_reads_are_not_found() {
    let (instance, cache, _dir) = instance_with_cache().await;
    let user = create_user(&instance, "alice").await;
    let accounts = instance.accounts();

    accounts.get_account(user.id).await.unwrap();
    accounts.destroy(user.id).await.unwrap();

    assert!(!cache.contains(user.id).await);
    assert!(accounts.get_account(user.id).await.unwrap_err().is_not_found());
    assert!(
        instance
            .backend()
            .get_account(user.id)
            .await
            .unwrap_err()
            .is_not_found()
    );
    // The failed read did not repopulate the cache
    assert!(cache.is_empty().await);
}

#[tokio::test]
async fn test_destroy_uncached_account() {
    let (instance, cache, _dir) = instance_with_cache().await;
    let user = create_user(&instance, "alice").await;

    instance.accounts().destroy(user.id).await.unwrap();
    assert!(cache.is_empty().await);
}

#[tokio::test]
async fn test_destroy_missing_row_still_evicts() {
    let (instance, cache, _dir) = instance_with_cache().await;
    let mut ghost = UserAccount::new("ghost");
    ghost.id = 99;
    cache.put(ghost).await.unwrap();

    let err = instance.accounts().destroy(99).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(!cache.contains(99).await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reads_during_destroy_never_resurrect() {
    for _ in 0..10 {
        let (instance, cache, _dir) = instance_with_cache().await;
        let user_id = create_user(&instance, "alice").await.id;

        let mut readers = Vec::new();
        for _ in 0..8 {
            let instance = instance.clone();
            readers.push(tokio::spawn(async move {
                let _ = instance.accounts().get_account(user_id).await;
            }));
        }
        instance.accounts().destroy(user_id).await.unwrap();
        for reader in readers {
            reader.await.unwrap();
        }

        assert!(!cache.contains(user_id).await);
        assert!(
            instance
                .accounts()
                .get_account(user_id)
                .await
                .unwrap_err()
                .is_not_found()
        );
    }
}

#[tokio::test]
async fn test_save_account_writes_through() {
    let (instance, cache, _dir) = instance_with_cache().await;
    let mut user = create_user(&instance, "alice").await;
    let accounts = instance.accounts();
    accounts.get_account(user.id).await.unwrap();

    user.nickname = Some("Alice".to_string());
    user.prefer_dark_mode = true;
    accounts.save_account(&user).await.unwrap();

    assert_eq!(cache.get(user.id).await.unwrap(), Some(user.clone()));
    assert_eq!(instance.backend().get_account(user.id).await.unwrap(), user);
}

#[tokio::test]
async fn test_lookup_by_username_and_email() {
    let (instance, _dir) = test_instance().await;
    let alice = instance
        .accounts()
        .create_account(UserAccount::new("alice").with_email("alice@example.com"))
        .await
        .unwrap();
    let accounts = instance.accounts();

    assert_eq!(accounts.find_by_username("alice").await.unwrap(), Some(alice.clone()));
    assert_eq!(
        accounts.find_by_email("alice@example.com").await.unwrap(),
        Some(alice)
    );
    assert!(accounts.find_by_username("nobody").await.unwrap().is_none());
    assert!(accounts.find_by_email("nobody@example.com").await.unwrap().is_none());
}

#[tokio::test]
async fn test_relationships_survive_until_files_deleted() {
    let (instance, dir) = test_instance().await;
    let user = create_user(&instance, "alice").await;
    let source = stage_file(dir.path(), "a", b"abc").await;
    instance
        .files()
        .upload(user.id, "a.txt", &source, 3, false)
        .await
        .unwrap();

    let related = instance.accounts().load_relationships(user.id).await.unwrap();
    assert_eq!(related.len(), 1);
    assert_eq!(related[0].filename, "a.txt");

    let other = create_user(&instance, "bob").await;
    assert!(instance.accounts().load_relationships(other.id).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_refresh_waits_for_in_flight_cache_fill() {
    let (config, _dir) = test_config();
    let cache = Arc::new(GatedCache::default());
    let instance = Instance::with_collaborators(
        Arc::from(test_backend().await),
        cache.clone(),
        Arc::new(LocalFileStore::default()),
        config,
    );
    let user_id = create_user(&instance, "alice").await.id;
    submit(&instance, user_id, 1, "Accepted", SUBMISSION_TYPE_NORMAL, 100).await;

    // A reader loads the pre-refresh row and stalls before caching it
    cache.arm();
    let reader = {
        let instance = instance.clone();
        tokio::spawn(async move { instance.accounts().get_account(user_id).await })
    };
    cache.reached.notified().await;

    let refresh = {
        let instance = instance.clone();
        tokio::spawn(async move { instance.stats().refresh_counters(user_id).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!refresh.is_finished(), "refresh ran during a cache fill");

    cache.release.notify_one();
    assert_eq!(reader.await.unwrap().unwrap().ac_num, 0);
    assert_eq!(refresh.await.unwrap().unwrap(), (1, 1));

    let cached = instance.accounts().get_account(user_id).await.unwrap();
    assert_eq!(cached.ac_num, 1);
    assert_eq!(cached.submit_num, 1);
}
