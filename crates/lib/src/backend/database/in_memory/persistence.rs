//! Persistence operations for the InMemory backend
//!
//! This module handles serialization and file I/O for saving/loading
//! the in-memory backend state to/from JSON files.

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use tokio::sync::{Mutex, RwLock};

use super::{FileRecordMap, InMemory, Sequences};
use crate::{
    Error, Result,
    backend::errors::BackendError,
    types::{FileRecord, PrivilegeGrant, SubmissionRecord, UserAccount},
};

/// The current persistence file format version.
/// v0 indicates this is an unstable format subject to breaking changes.
const PERSISTENCE_VERSION: u8 = 0;

/// Helper to check if version is default (0) for serde skip_serializing_if
fn is_v0(v: &u8) -> bool {
    *v == 0
}

/// Validates the persistence version during deserialization.
fn validate_persistence_version<'de, D>(deserializer: D) -> std::result::Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let version = u8::deserialize(deserializer)?;
    if version != PERSISTENCE_VERSION {
        return Err(serde::de::Error::custom(format!(
            "unsupported persistence version {version}; only version {PERSISTENCE_VERSION} is supported"
        )));
    }
    Ok(version)
}

/// Serializable snapshot of the InMemory backend.
///
/// Tables are stored as flat lists; JSON object keys must be strings, and
/// the tracking-record map is keyed by a tuple.
#[derive(Serialize, Deserialize)]
struct SerializableDatabase {
    /// File format version for compatibility checking
    #[serde(
        rename = "_v",
        default,
        skip_serializing_if = "is_v0",
        deserialize_with = "validate_persistence_version"
    )]
    version: u8,
    #[serde(default)]
    accounts: Vec<UserAccount>,
    #[serde(default)]
    grants: Vec<PrivilegeGrant>,
    #[serde(default)]
    submissions: Vec<SubmissionRecord>,
    #[serde(default)]
    file_records: Vec<FileRecord>,
    #[serde(default)]
    sequences: Sequences,
}

impl From<SerializableDatabase> for InMemory {
    fn from(snapshot: SerializableDatabase) -> Self {
        let accounts = snapshot.accounts.into_iter().map(|a| (a.id, a)).collect();
        let file_records: FileRecordMap = snapshot
            .file_records
            .into_iter()
            .map(|r| ((r.tag.clone(), r.filename.clone()), r))
            .collect();

        InMemory {
            accounts: RwLock::new(accounts),
            grants: RwLock::new(snapshot.grants.into_iter().collect()),
            submissions: RwLock::new(snapshot.submissions),
            file_records: RwLock::new(file_records),
            sequences: Mutex::new(snapshot.sequences),
        }
    }
}

/// Saves the entire backend state to a specified file as JSON.
///
/// # Arguments
/// * `backend` - The InMemory backend to save
/// * `path` - The path to the file where the state should be saved.
pub(crate) async fn save_to_file<P: AsRef<Path>>(backend: &InMemory, path: P) -> Result<()> {
    let accounts = backend.accounts.read().await.values().cloned().collect();
    let grants = backend.grants.read().await.iter().cloned().collect();
    let submissions = backend.submissions.read().await.clone();
    let file_records = backend.file_records.read().await.values().cloned().collect();
    let sequences = backend.sequences.lock().await.clone();

    let serializable = SerializableDatabase {
        version: PERSISTENCE_VERSION,
        accounts,
        grants,
        submissions,
        file_records,
        sequences,
    };

    let json = serde_json::to_string_pretty(&serializable)
        .map_err(|e| -> Error { BackendError::SerializationFailed { source: e }.into() })?;
    tokio::fs::write(path, json)
        .await
        .map_err(|e| -> Error { BackendError::FileIo { source: e }.into() })
}

/// Loads the backend state from a specified JSON file.
///
/// If the file does not exist, a new, empty `InMemory` backend is returned.
pub(crate) async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<InMemory> {
    match tokio::fs::read_to_string(path).await {
        Ok(json) => {
            let snapshot: SerializableDatabase = serde_json::from_str(&json).map_err(|e| -> Error {
                BackendError::DeserializationFailed { source: e }.into()
            })?;
            Ok(snapshot.into())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(InMemory::new()),
        Err(e) => Err(BackendError::FileIo { source: e }.into()),
    }
}
