use std::{
    any::Any,
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use roster::{
    Instance, Result,
    cache::InMemoryCache,
    storage::{FileEntry, FileStore, LocalFileStore, Normalizer},
};

use crate::helpers::{create_user, stage_file, test_backend, test_config, test_instance};

/// File store that records how many mutations run at the same time.
struct TrackingStore {
    inner: LocalFileStore,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl TrackingStore {
    fn new() -> Self {
        Self {
            inner: LocalFileStore::new(Normalizer::Disabled),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    async fn tracked<F: std::future::Future<Output = Result<()>>>(&self, op: F) -> Result<()> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(2)).await;
        let result = op.await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[async_trait]
impl FileStore for TrackingStore {
    async fn exists(&self, path: &Path) -> Result<bool> {
        self.inner.exists(path).await
    }

    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        self.inner.ensure_dir(path).await
    }

    async fn list(&self, dir: &Path) -> Result<Vec<FileEntry>> {
        self.inner.list(dir).await
    }

    async fn move_file(&self, from: &Path, to: &Path) -> Result<()> {
        self.tracked(self.inner.move_file(from, to)).await
    }

    async fn remove(&self, path: &Path) -> Result<()> {
        self.tracked(self.inner.remove(path)).await
    }

    async fn normalize(&self, path: &Path) -> Result<()> {
        self.inner.normalize(path).await
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_same_user_mutations_never_overlap() {
    let (config, dir) = test_config();
    let store = Arc::new(TrackingStore::new());
    let instance = Instance::with_collaborators(
        Arc::from(test_backend().await),
        Arc::new(InMemoryCache::new()),
        store.clone(),
        config,
    );
    let user_id = create_user(&instance, "alice").await.id;

    let mut handles = Vec::new();
    for i in 0..16 {
        let instance = instance.clone();
        let source = stage_file(dir.path(), "f", format!("{i}").as_bytes()).await;
        handles.push(tokio::spawn(async move {
            let files = instance.files();
            let name = format!("f{}.txt", i % 4);
            if i % 3 == 0 {
                files.delete(user_id, &name).await
            } else {
                files.upload(user_id, &name, &source, 1, false).await.map(|_| ())
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(store.max_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(instance.locks().active_keys(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_different_users_run_concurrently() {
    let (config, dir) = test_config();
    let store = Arc::new(TrackingStore::new());
    let instance = Instance::with_collaborators(
        Arc::from(test_backend().await),
        Arc::new(InMemoryCache::new()),
        store.clone(),
        config,
    );

    let mut users = Vec::new();
    for name in ["alice", "bob", "carol", "dave"] {
        users.push(create_user(&instance, name).await);
    }

    // Hold every user's lock except the last; the last user's upload must
    // still complete.
    let mut guards = Vec::new();
    for user in &users[..3] {
        guards.push(
            instance
                .locks()
                .lock(roster::lock::LockKey::user_files(user.id))
                .await
                .unwrap(),
        );
    }
    let source = stage_file(dir.path(), "d", b"d").await;
    tokio::time::timeout(
        Duration::from_secs(5),
        instance.files().upload(users[3].id, "d.txt", &source, 1, false),
    )
    .await
    .expect("upload blocked by other users' locks")
    .unwrap();
    drop(guards);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_upload_delete_race_ends_in_a_serial_state() {
    for _ in 0..10 {
        let (instance, dir) = test_instance().await;
        let user_id = create_user(&instance, "alice").await.id;
        let source = stage_file(dir.path(), "a", b"payload").await;

        let uploader = {
            let instance = instance.clone();
            tokio::spawn(async move {
                instance
                    .files()
                    .upload(user_id, "a.txt", &source, 7, false)
                    .await
            })
        };
        let deleter = {
            let instance = instance.clone();
            tokio::spawn(async move { instance.files().delete(user_id, "a.txt").await })
        };
        uploader.await.unwrap().unwrap();
        deleter.await.unwrap().unwrap();

        // Either delete ran first (file present, tracked) or upload ran
        // first (file gone, untracked). Never a mix of the two.
        let files = instance.files();
        let listing = files.list(user_id).await.unwrap_or_default();
        let records = files.records(user_id).await.unwrap();
        match listing.files.as_slice() {
            [] => assert!(records.is_empty()),
            [entry] => {
                assert_eq!(entry.filename, "a.txt");
                assert_eq!(entry.size, 7);
                assert_eq!(records.len(), 1);
            }
            other => panic!("unexpected directory state {other:?}"),
        }
    }
}
