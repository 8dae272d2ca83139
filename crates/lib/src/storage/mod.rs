//! File storage collaborator.
//!
//! [`FileStore`] is the narrow filesystem surface the file manager needs.
//! [`LocalFileStore`] implements it on top of `tokio::fs`; every failure is
//! reported as [`FileError::StorageUnavailable`] carrying the path.

use std::{
    any::Any,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Result, files::FileError};

/// A regular file found in a directory listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub filename: String,
    /// Size in bytes
    pub size: u64,
}

/// Line-ending normalization strategy applied after uploads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Normalizer {
    /// Rewrite CRLF to LF in-process.
    Builtin,
    /// Run an external program with the file path as its only argument.
    Command { program: String },
    /// Leave files untouched.
    Disabled,
}

impl Default for Normalizer {
    fn default() -> Self {
        Normalizer::Command {
            program: "dos2unix".to_string(),
        }
    }
}

/// Filesystem operations used by the file manager.
#[async_trait]
pub trait FileStore: Send + Sync + Any {
    /// Whether `path` exists.
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Create `path` and its parents if missing.
    async fn ensure_dir(&self, path: &Path) -> Result<()>;

    /// Regular files directly inside `dir`, with sizes, sorted by name.
    /// Directories and other non-file entries are skipped.
    async fn list(&self, dir: &Path) -> Result<Vec<FileEntry>>;

    /// Move `from` to `to`, replacing any existing file at `to`.
    async fn move_file(&self, from: &Path, to: &Path) -> Result<()>;

    /// Remove a file. A missing file is not an error.
    async fn remove(&self, path: &Path) -> Result<()>;

    /// Normalize line endings of a file. Callers treat failures as advisory.
    async fn normalize(&self, path: &Path) -> Result<()>;

    fn as_any(&self) -> &dyn Any;
}

/// [`FileStore`] over the local filesystem.
#[derive(Clone, Debug, Default)]
pub struct LocalFileStore {
    normalizer: Normalizer,
}

impl LocalFileStore {
    pub fn new(normalizer: Normalizer) -> Self {
        Self { normalizer }
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }
}

/// Replace every CRLF pair with a bare LF.
fn crlf_to_lf(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut bytes = input.iter().peekable();
    while let Some(&b) = bytes.next() {
        if b == b'\r' && bytes.peek() == Some(&&b'\n') {
            continue;
        }
        out.push(b);
    }
    out
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn exists(&self, path: &Path) -> Result<bool> {
        tokio::fs::try_exists(path)
            .await
            .map_err(|e| FileError::storage("stat", path, e).into())
    }

    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| FileError::storage("create directory", path, e).into())
    }

    async fn list(&self, dir: &Path) -> Result<Vec<FileEntry>> {
        let mut read_dir = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| FileError::storage("read directory", dir, e))?;

        let mut entries = Vec::new();
        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| FileError::storage("read directory", dir, e))?
        {
            let path = entry.path();
            let metadata = tokio::fs::metadata(&path)
                .await
                .map_err(|e| FileError::storage("stat", &path, e))?;
            if !metadata.is_file() {
                continue;
            }
            entries.push(FileEntry {
                filename: entry.file_name().to_string_lossy().into_owned(),
                size: metadata.len(),
            });
        }
        entries.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(entries)
    }

    async fn move_file(&self, from: &Path, to: &Path) -> Result<()> {
        if let Err(rename_err) = tokio::fs::rename(from, to).await {
            // rename cannot cross filesystems; fall back to copy + remove
            debug!(?from, ?to, error = %rename_err, "rename failed, copying instead");
            tokio::fs::copy(from, to)
                .await
                .map_err(|e| FileError::storage("copy", to, e))?;
            tokio::fs::remove_file(from)
                .await
                .map_err(|e| FileError::storage("remove", from, e))?;
        }
        Ok(())
    }

    async fn remove(&self, path: &Path) -> Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FileError::storage("remove", path, e).into()),
        }
    }

    async fn normalize(&self, path: &Path) -> Result<()> {
        match &self.normalizer {
            Normalizer::Disabled => Ok(()),
            Normalizer::Builtin => {
                let content = tokio::fs::read(path)
                    .await
                    .map_err(|e| FileError::storage("read", path, e))?;
                let normalized = crlf_to_lf(&content);
                if normalized.len() != content.len() {
                    tokio::fs::write(path, normalized)
                        .await
                        .map_err(|e| FileError::storage("write", path, e))?;
                }
                Ok(())
            }
            Normalizer::Command { program } => {
                let output = tokio::process::Command::new(program)
                    .arg(path)
                    .output()
                    .await
                    .map_err(|e| FileError::NormalizationFailed {
                        path: PathBuf::from(path),
                        reason: format!("failed to run {program}: {e}"),
                    })?;
                if !output.status.success() {
                    return Err(FileError::NormalizationFailed {
                        path: PathBuf::from(path),
                        reason: format!(
                            "{program} exited with {}: {}",
                            output.status,
                            String::from_utf8_lossy(&output.stderr).trim()
                        ),
                    }
                    .into());
                }
                Ok(())
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
