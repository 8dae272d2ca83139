//! Privilege grant storage for SQL backends.

use super::{SqlxBackend, SqlxResultExt, is_unique_violation};
use crate::Result;
use crate::backend::errors::BackendError;
use crate::types::{PrivilegeGrant, UserId};

/// List a user's grants ordered by privilege name.
pub async fn list(backend: &SqlxBackend, user_id: UserId) -> Result<Vec<PrivilegeGrant>> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT privilege FROM user_privileges WHERE user_id = $1 ORDER BY privilege",
    )
    .bind(user_id)
    .fetch_all(backend.pool())
    .await
    .sql_context("Failed to list grants")?;

    Ok(rows
        .into_iter()
        .map(|(privilege,)| PrivilegeGrant { user_id, privilege })
        .collect())
}

/// Find a single grant.
pub async fn find(
    backend: &SqlxBackend,
    user_id: UserId,
    privilege: &str,
) -> Result<Option<PrivilegeGrant>> {
    let row: Option<(String,)> = sqlx::query_as(
        "SELECT privilege FROM user_privileges WHERE user_id = $1 AND privilege = $2",
    )
    .bind(user_id)
    .bind(privilege)
    .fetch_optional(backend.pool())
    .await
    .sql_context("Failed to find grant")?;

    Ok(row.map(|(privilege,)| PrivilegeGrant { user_id, privilege }))
}

/// Insert a grant; the (user, privilege) pair is the primary key.
pub async fn create(
    backend: &SqlxBackend,
    user_id: UserId,
    privilege: &str,
) -> Result<PrivilegeGrant> {
    sqlx::query("INSERT INTO user_privileges (user_id, privilege) VALUES ($1, $2)")
        .bind(user_id)
        .bind(privilege)
        .execute(backend.pool())
        .await
        .map_err(|e| -> crate::Error {
            if is_unique_violation(&e) {
                BackendError::DuplicateGrant {
                    user_id,
                    privilege: privilege.to_string(),
                }
                .into()
            } else {
                BackendError::SqlxError {
                    reason: format!("Failed to create grant: {e}"),
                    source: Some(e),
                }
                .into()
            }
        })?;

    Ok(PrivilegeGrant {
        user_id,
        privilege: privilege.to_string(),
    })
}

/// Delete a grant.
pub async fn remove(backend: &SqlxBackend, grant: &PrivilegeGrant) -> Result<()> {
    let result = sqlx::query("DELETE FROM user_privileges WHERE user_id = $1 AND privilege = $2")
        .bind(grant.user_id)
        .bind(&grant.privilege)
        .execute(backend.pool())
        .await
        .sql_context("Failed to remove grant")?;

    if result.rows_affected() == 0 {
        return Err(BackendError::GrantNotFound {
            user_id: grant.user_id,
            privilege: grant.privilege.clone(),
        }
        .into());
    }
    Ok(())
}
