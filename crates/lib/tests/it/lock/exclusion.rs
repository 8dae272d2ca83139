use std::time::Duration;

use roster::{Config, Instance, backend::database::InMemory, lock::LockConfig, lock::LockKey};

use crate::helpers::{create_user, stage_file, test_config, test_instance, test_instance_with_config};

#[tokio::test]
async fn test_upload_waits_for_same_user_lock() {
    let (instance, dir) = test_instance().await;
    let user = create_user(&instance, "alice").await;
    let source = stage_file(dir.path(), "a.txt", b"abc").await;

    let guard = instance
        .locks()
        .lock(LockKey::user_files(user.id))
        .await
        .unwrap();

    let files = instance.files();
    let upload = files.upload(user.id, "a.txt", &source, 3, false);
    tokio::pin!(upload);
    assert!(
        tokio::time::timeout(Duration::from_millis(100), &mut upload)
            .await
            .is_err(),
        "upload ran while the user's file lock was held"
    );

    drop(guard);
    let outcome = upload.await.unwrap();
    assert!(!outcome.replaced);
}

#[tokio::test]
async fn test_other_users_are_not_blocked() {
    let (instance, dir) = test_instance().await;
    let alice = create_user(&instance, "alice").await;
    let bob = create_user(&instance, "bob").await;
    let source = stage_file(dir.path(), "b.txt", b"b").await;

    let _guard = instance
        .locks()
        .lock(LockKey::user_files(alice.id))
        .await
        .unwrap();

    tokio::time::timeout(
        Duration::from_secs(5),
        instance.files().upload(bob.id, "b.txt", &source, 1, false),
    )
    .await
    .expect("upload for another user blocked")
    .unwrap();
}

#[tokio::test]
async fn test_file_and_refresh_locks_are_independent() {
    let (instance, _dir) = test_instance().await;
    let user = create_user(&instance, "alice").await;

    let _guard = instance
        .locks()
        .lock(LockKey::user_files(user.id))
        .await
        .unwrap();

    tokio::time::timeout(
        Duration::from_secs(5),
        instance.stats().refresh_counters(user.id),
    )
    .await
    .expect("refresh blocked on the file lock")
    .unwrap();
}

#[tokio::test]
async fn test_configured_timeout_surfaces_as_error() {
    let (config, dir) = test_config();
    let config = config.with_lock(LockConfig::with_timeout(Duration::from_millis(50)));
    let instance = test_instance_with_config(config).await;
    let user = create_user(&instance, "alice").await;
    let source = stage_file(dir.path(), "a.txt", b"abc").await;

    let _guard = instance
        .locks()
        .lock(LockKey::user_files(user.id))
        .await
        .unwrap();

    let err = instance
        .files()
        .upload(user.id, "a.txt", &source, 3, false)
        .await
        .unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(err.module(), "lock");
    // The staged file was not touched
    assert!(source.exists());
}

#[tokio::test]
async fn test_lock_table_empties_after_operations() {
    let instance = Instance::open(Box::new(InMemory::new()), Config::default());
    let user = create_user(&instance, "alice").await;

    instance.stats().refresh_counters(user.id).await.unwrap();
    instance.accounts().get_account(user.id).await.unwrap();
    instance.accounts().destroy(user.id).await.unwrap();

    assert_eq!(instance.locks().active_keys(), 0);
}
