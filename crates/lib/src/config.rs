//! Runtime configuration.
//!
//! Loaded from a JSON file; every field has a default so a partial (or
//! empty) object is valid.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Result, UserId, constants::USER_UPLOAD_DIR, lock::LockConfig, storage::Normalizer};

/// Per-user upload limits. Each bound is optional.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadQuota {
    /// Maximum total bytes across the user's directory after the upload
    #[serde(default)]
    pub max_total_size: Option<u64>,
    /// Maximum number of files after the upload
    #[serde(default)]
    pub max_file_count: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root directory; user files go to `<upload_dir>/user-upload/<user_id>`.
    pub upload_dir: PathBuf,
    pub lock: LockConfig,
    pub normalizer: Normalizer,
    /// Upload quota; `None` disables quota checks entirely.
    pub quota: Option<UploadQuota>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            lock: LockConfig::default(),
            normalizer: Normalizer::default(),
            quota: None,
        }
    }
}

impl Config {
    /// Read a configuration file.
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Set the upload root (builder style).
    pub fn with_upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.upload_dir = dir.into();
        self
    }

    /// Set the normalizer (builder style).
    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Set the upload quota (builder style).
    pub fn with_quota(mut self, quota: UploadQuota) -> Self {
        self.quota = Some(quota);
        self
    }

    /// Set the lock configuration (builder style).
    pub fn with_lock(mut self, lock: LockConfig) -> Self {
        self.lock = lock;
        self
    }

    /// Directory holding one user's uploads.
    pub fn user_dir(&self, user_id: UserId) -> PathBuf {
        self.upload_dir
            .join(USER_UPLOAD_DIR)
            .join(user_id.to_string())
    }
}
