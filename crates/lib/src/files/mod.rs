//! Per-user uploaded file management.
//!
//! Every user owns one directory, `<upload_dir>/user-upload/<user_id>`.
//! Uploads and deletions for the same user are serialized on the
//! `(UserFiles, user_id)` lock; listings take no lock and observe the
//! directory either before or after a mutation.
//!
//! Each stored file is mirrored by a [`FileRecord`] tagged
//! `upload-by-user-<id>` so relationship queries can be answered by the
//! persistence backend.

mod errors;

use std::{
    fmt,
    path::{Component, Path},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub use errors::FileError;

use crate::{
    Config, Result, UserId,
    backend::BackendImpl,
    config::UploadQuota,
    constants::upload_tag,
    lock::{LockKey, LockService},
    storage::FileStore,
    types::FileRecord,
};

pub use crate::storage::FileEntry;

/// Contents of a user's upload directory.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileListing {
    pub files: Vec<FileEntry>,
    /// Archive of the directory; never produced.
    pub zip: Option<String>,
}

impl FileListing {
    /// Sum of all file sizes in bytes.
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }
}

/// What an upload found in the directory before moving the new file in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UploadOutcome {
    /// A file of the same name already existed and was overwritten
    pub replaced: bool,
    /// Total size of the files other than the uploaded name
    pub previous_size: u64,
    /// Number of files before the upload
    pub previous_count: usize,
}

/// Reject anything that is not a single plain path component.
fn validate_filename(filename: &str) -> std::result::Result<(), FileError> {
    let mut components = Path::new(filename).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) if name == filename => Ok(()),
        _ => Err(FileError::InvalidFilename {
            filename: filename.to_string(),
        }),
    }
}

fn check_quota(
    quota: &UploadQuota,
    user_id: UserId,
    outcome: &UploadOutcome,
    size: u64,
) -> std::result::Result<(), FileError> {
    if let Some(max) = quota.max_total_size
        && outcome.previous_size.saturating_add(size) > max
    {
        return Err(FileError::QuotaExceeded {
            user_id,
            reason: format!(
                "{} bytes stored plus {size} uploaded exceeds {max}",
                outcome.previous_size
            ),
        });
    }
    if let Some(max) = quota.max_file_count
        && !outcome.replaced
        && outcome.previous_count + 1 > max
    {
        return Err(FileError::QuotaExceeded {
            user_id,
            reason: format!("{} files stored, at most {max} allowed", outcome.previous_count),
        });
    }
    Ok(())
}

/// Coordinates list/upload/delete on users' upload directories.
#[derive(Clone)]
pub struct FileManager {
    backend: Arc<dyn BackendImpl>,
    store: Arc<dyn FileStore>,
    locks: LockService,
    config: Arc<Config>,
}

impl fmt::Debug for FileManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileManager")
            .field("upload_dir", &self.config.upload_dir)
            .field("locks", &self.locks)
            .finish_non_exhaustive()
    }
}

impl FileManager {
    pub fn new(
        backend: Arc<dyn BackendImpl>,
        store: Arc<dyn FileStore>,
        locks: LockService,
        config: Arc<Config>,
    ) -> Self {
        Self {
            backend,
            store,
            locks,
            config,
        }
    }

    /// List a user's files.
    ///
    /// Returns `None` when the directory is missing or cannot be read;
    /// the failure is logged, not raised.
    pub async fn list(&self, user_id: UserId) -> Option<FileListing> {
        let dir = self.config.user_dir(user_id);
        match self.store.list(&dir).await {
            Ok(files) => Some(FileListing { files, zip: None }),
            Err(e) => {
                debug!(user_id, ?dir, error = %e, "Directory listing unavailable");
                None
            }
        }
    }

    /// Move `source` into the user's directory as `filename`.
    ///
    /// An existing file of the same name is replaced. Line endings are then
    /// normalized on a best-effort basis. With `no_limit` set the
    /// configured quota is not applied.
    pub async fn upload(
        &self,
        user_id: UserId,
        filename: &str,
        source: &Path,
        size: u64,
        no_limit: bool,
    ) -> Result<UploadOutcome> {
        validate_filename(filename)?;

        let _guard = self.locks.lock(LockKey::user_files(user_id)).await?;

        let dir = self.config.user_dir(user_id);
        self.store.ensure_dir(&dir).await?;

        let mut outcome = UploadOutcome::default();
        if let Some(listing) = self.list(user_id).await {
            outcome.previous_count = listing.files.len();
            for file in &listing.files {
                if file.filename == filename {
                    outcome.replaced = true;
                } else {
                    outcome.previous_size += file.size;
                }
            }
        }

        if !no_limit && let Some(quota) = &self.config.quota {
            check_quota(quota, user_id, &outcome, size)?;
        }

        let target = dir.join(filename);
        self.store.move_file(source, &target).await?;

        if let Err(e) = self.store.normalize(&target).await {
            warn!(user_id, filename, error = %e, "Normalization failed, keeping file as uploaded");
        }

        // Normalization may have shrunk the file
        let stored_size = match self.store.list(&dir).await {
            Ok(files) => files
                .into_iter()
                .find(|f| f.filename == filename)
                .map_or(size, |f| f.size),
            Err(e) => {
                debug!(user_id, filename, error = %e, "Keeping declared size");
                size
            }
        };
        self.backend
            .upsert_file_record(&upload_tag(user_id), filename, stored_size)
            .await?;

        info!(
            user_id,
            filename,
            size = stored_size,
            replaced = outcome.replaced,
            previous_size = outcome.previous_size,
            "Stored upload"
        );
        Ok(outcome)
    }

    /// Remove one of the user's files. A missing file is not an error.
    pub async fn delete(&self, user_id: UserId, filename: &str) -> Result<()> {
        validate_filename(filename)?;

        let _guard = self.locks.lock(LockKey::user_files(user_id)).await?;

        self.store
            .remove(&self.config.user_dir(user_id).join(filename))
            .await?;
        let tracked = self
            .backend
            .remove_file_record(&upload_tag(user_id), filename)
            .await?;

        info!(user_id, filename, tracked, "Deleted upload");
        Ok(())
    }

    /// Tracking records of the user's uploads.
    pub async fn records(&self, user_id: UserId) -> Result<Vec<FileRecord>> {
        self.backend.list_file_records(&upload_tag(user_id)).await
    }
}
