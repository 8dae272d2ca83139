//! File tracking records for SQL backends.

use super::{SqlxBackend, SqlxResultExt};
use crate::Result;
use crate::backend::errors::BackendError;
use crate::types::FileRecord;

fn size_to_db(size: u64) -> Result<i64> {
    i64::try_from(size).map_err(|_| {
        BackendError::StateInconsistency {
            reason: format!("file size {size} does not fit a BIGINT column"),
        }
        .into()
    })
}

/// Tracking records of one owner tag, ordered by filename.
pub async fn list(backend: &SqlxBackend, tag: &str) -> Result<Vec<FileRecord>> {
    let rows: Vec<(i64, String, i64)> =
        sqlx::query_as("SELECT id, filename, size FROM files WHERE tag = $1 ORDER BY filename")
            .bind(tag)
            .fetch_all(backend.pool())
            .await
            .sql_context("Failed to list file records")?;

    rows.into_iter()
        .map(|(id, filename, size)| -> Result<FileRecord> {
            let size = u64::try_from(size).map_err(|_| BackendError::StateInconsistency {
                reason: format!("negative size stored for {tag}/{filename}"),
            })?;
            Ok(FileRecord {
                id,
                tag: tag.to_string(),
                filename,
                size,
            })
        })
        .collect()
}

/// Insert a tracking record or update the size of an existing one.
pub async fn upsert(backend: &SqlxBackend, tag: &str, filename: &str, size: u64) -> Result<FileRecord> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO files (tag, filename, size) VALUES ($1, $2, $3) \
         ON CONFLICT (tag, filename) DO UPDATE SET size = excluded.size \
         RETURNING id",
    )
    .bind(tag)
    .bind(filename)
    .bind(size_to_db(size)?)
    .fetch_one(backend.pool())
    .await
    .sql_context("Failed to upsert file record")?;

    Ok(FileRecord {
        id,
        tag: tag.to_string(),
        filename: filename.to_string(),
        size,
    })
}

/// Delete a tracking record; returns whether one existed.
pub async fn remove(backend: &SqlxBackend, tag: &str, filename: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM files WHERE tag = $1 AND filename = $2")
        .bind(tag)
        .bind(filename)
        .execute(backend.pool())
        .await
        .sql_context("Failed to remove file record")?;
    Ok(result.rows_affected() > 0)
}
