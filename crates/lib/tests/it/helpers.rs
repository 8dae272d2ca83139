use std::{
    any::Any,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use roster::{
    Config, Instance, Result, UserAccount, UserId,
    backend::{BackendImpl, database::InMemory},
    cache::InMemoryCache,
    storage::{LocalFileStore, Normalizer},
    types::{FileRecord, PrivilegeGrant, ProblemId, SubmissionFilter, SubmissionRecord},
};
use tempfile::TempDir;

// ==========================
// CORE TEST FACTORIES
// ==========================
// Single point of change for backend matrix testing via TEST_BACKEND env var.

/// Creates a test backend based on TEST_BACKEND env var.
///
/// Supported values:
/// - "inmemory" or unset: InMemory backend (default)
/// - "sqlite": SQLite in-memory backend (requires `sqlite` feature)
/// - "postgres": PostgreSQL backend (requires `postgres` feature and TEST_POSTGRES_URL)
///
/// # Example
/// ```bash
/// TEST_BACKEND=sqlite cargo test --features sqlite
/// ```
pub async fn test_backend() -> Box<dyn BackendImpl> {
    match std::env::var("TEST_BACKEND").as_deref() {
        Ok("sqlite") => {
            #[cfg(feature = "sqlite")]
            {
                use roster::backend::database::Sqlite;
                Box::new(
                    Sqlite::sqlite_in_memory()
                        .await
                        .expect("Failed to create SQLite backend"),
                )
            }
            #[cfg(not(feature = "sqlite"))]
            {
                panic!("TEST_BACKEND=sqlite requires the 'sqlite' feature to be enabled")
            }
        }
        Ok("postgres") => {
            #[cfg(feature = "postgres")]
            {
                use roster::backend::database::Postgres;
                let url = std::env::var("TEST_POSTGRES_URL")
                    .unwrap_or_else(|_| "postgres://localhost/roster_test".to_string());
                Box::new(
                    Postgres::connect_postgres_isolated(&url)
                        .await
                        .expect("Failed to connect to PostgreSQL"),
                )
            }
            #[cfg(not(feature = "postgres"))]
            {
                panic!("TEST_BACKEND=postgres requires the 'postgres' feature to be enabled")
            }
        }
        Ok("inmemory") | Ok("") | Err(_) => Box::new(InMemory::new()),
        Ok(other) => {
            panic!("Unknown TEST_BACKEND value: {other}. Supported: inmemory, sqlite, postgres")
        }
    }
}

/// Configuration rooted in a fresh temporary directory.
///
/// The builtin normalizer keeps tests independent of `dos2unix` being
/// installed. The directory is removed when the returned `TempDir` drops.
pub fn test_config() -> (Config, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config = Config::default()
        .with_upload_dir(dir.path().join("data"))
        .with_normalizer(Normalizer::Builtin);
    (config, dir)
}

/// An Instance over the TEST_BACKEND backend with a temporary upload root.
pub async fn test_instance() -> (Instance, TempDir) {
    let (config, dir) = test_config();
    (test_instance_with_config(config).await, dir)
}

pub async fn test_instance_with_config(config: Config) -> Instance {
    Instance::open(test_backend().await, config)
}

/// Create an account and return it with its assigned id.
pub async fn create_user(instance: &Instance, username: &str) -> UserAccount {
    instance
        .accounts()
        .create_account(UserAccount::new(username))
        .await
        .expect("Failed to create account")
}

/// Create accounts until one with `id` exists and return that one.
pub async fn create_user_with_id(instance: &Instance, id: UserId) -> UserAccount {
    loop {
        let account = create_user(instance, &format!("user{}", unique_suffix())).await;
        if account.id >= id {
            assert_eq!(account.id, id, "backend skipped id {id}");
            return account;
        }
    }
}

fn unique_suffix() -> String {
    static NEXT: AtomicUsize = AtomicUsize::new(0);
    NEXT.fetch_add(1, Ordering::Relaxed).to_string()
}

/// Append a submission to the log.
pub async fn submit(
    instance: &Instance,
    user_id: UserId,
    problem_id: ProblemId,
    status: &str,
    submission_type: i64,
    submit_time: i64,
) -> SubmissionRecord {
    instance
        .backend()
        .insert_submission(SubmissionRecord {
            id: 0,
            user_id,
            problem_id,
            status: status.to_string(),
            submission_type,
            submit_time,
            language: Some("cpp".to_string()),
        })
        .await
        .expect("Failed to insert submission")
}

/// Write `content` to a fresh file under `dir/incoming` and return its path.
pub async fn stage_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let incoming = dir.join("incoming");
    tokio::fs::create_dir_all(&incoming)
        .await
        .expect("Failed to create staging dir");
    let path = incoming.join(format!("{}-{name}", unique_suffix()));
    tokio::fs::write(&path, content)
        .await
        .expect("Failed to stage file");
    path
}

// ==========================
// WRITE-COUNTING BACKEND
// ==========================

/// Backend wrapper counting grant writes (creations and removals).
///
/// A privilege passed to [`CountingBackend::hide_grant`] is still listed but
/// no longer found, as if another writer removed it in between.
pub struct CountingBackend {
    inner: Box<dyn BackendImpl>,
    grant_writes: AtomicUsize,
    hidden: Mutex<Option<String>>,
}

impl CountingBackend {
    pub fn new(inner: Box<dyn BackendImpl>) -> Self {
        Self {
            inner,
            grant_writes: AtomicUsize::new(0),
            hidden: Mutex::new(None),
        }
    }

    pub fn hide_grant(&self, privilege: &str) {
        *self.hidden.lock().unwrap() = Some(privilege.to_string());
    }

    pub fn grant_writes(&self) -> usize {
        self.grant_writes.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.grant_writes.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl BackendImpl for CountingBackend {
    async fn get_account(&self, id: UserId) -> Result<UserAccount> {
        self.inner.get_account(id).await
    }

    async fn find_account_by_username(&self, username: &str) -> Result<Option<UserAccount>> {
        self.inner.find_account_by_username(username).await
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<UserAccount>> {
        self.inner.find_account_by_email(email).await
    }

    async fn create_account(&self, account: UserAccount) -> Result<UserAccount> {
        self.inner.create_account(account).await
    }

    async fn save_account(&self, account: &UserAccount) -> Result<()> {
        self.inner.save_account(account).await
    }

    async fn remove_account(&self, id: UserId) -> Result<()> {
        self.inner.remove_account(id).await
    }

    async fn list_grants(&self, user_id: UserId) -> Result<Vec<PrivilegeGrant>> {
        self.inner.list_grants(user_id).await
    }

    async fn find_grant(
        &self,
        user_id: UserId,
        privilege: &str,
    ) -> Result<Option<PrivilegeGrant>> {
        if self.hidden.lock().unwrap().as_deref() == Some(privilege) {
            return Ok(None);
        }
        self.inner.find_grant(user_id, privilege).await
    }

    async fn create_grant(&self, user_id: UserId, privilege: &str) -> Result<PrivilegeGrant> {
        self.grant_writes.fetch_add(1, Ordering::SeqCst);
        self.inner.create_grant(user_id, privilege).await
    }

    async fn remove_grant(&self, grant: &PrivilegeGrant) -> Result<()> {
        self.grant_writes.fetch_add(1, Ordering::SeqCst);
        self.inner.remove_grant(grant).await
    }

    async fn insert_submission(&self, record: SubmissionRecord) -> Result<SubmissionRecord> {
        self.inner.insert_submission(record).await
    }

    async fn count_submissions(&self, filter: &SubmissionFilter) -> Result<u64> {
        self.inner.count_submissions(filter).await
    }

    async fn count_distinct_problems(&self, filter: &SubmissionFilter) -> Result<u64> {
        self.inner.count_distinct_problems(filter).await
    }

    async fn distinct_problem_ids(&self, filter: &SubmissionFilter) -> Result<Vec<ProblemId>> {
        self.inner.distinct_problem_ids(filter).await
    }

    async fn latest_submission(&self, user_id: UserId) -> Result<Option<SubmissionRecord>> {
        self.inner.latest_submission(user_id).await
    }

    async fn list_file_records(&self, tag: &str) -> Result<Vec<FileRecord>> {
        self.inner.list_file_records(tag).await
    }

    async fn upsert_file_record(
        &self,
        tag: &str,
        filename: &str,
        size: u64,
    ) -> Result<FileRecord> {
        self.inner.upsert_file_record(tag, filename, size).await
    }

    async fn remove_file_record(&self, tag: &str, filename: &str) -> Result<bool> {
        self.inner.remove_file_record(tag, filename).await
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// An Instance whose backend counts grant writes.
pub async fn counting_instance() -> (Instance, Arc<CountingBackend>, TempDir) {
    let (config, dir) = test_config();
    let backend = Arc::new(CountingBackend::new(test_backend().await));
    let instance = Instance::with_collaborators(
        backend.clone(),
        Arc::new(InMemoryCache::new()),
        Arc::new(LocalFileStore::new(config.normalizer.clone())),
        config,
    );
    (instance, backend, dir)
}
