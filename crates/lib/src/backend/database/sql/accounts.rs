//! Account storage for SQL backends.

use sqlx::Row;
use sqlx::any::AnyRow;

use super::{SqlxBackend, SqlxResultExt, is_unique_violation};
use crate::Result;
use crate::backend::errors::BackendError;
use crate::types::{UserAccount, UserId};

const ACCOUNT_COLUMNS: &str = "id, username, email, nickname, nameplate, information, \
     ac_num, submit_num, is_admin, is_show, public_email, prefer_dark_mode, \
     sex, rating, register_time, is_banned";

fn flag(row: &AnyRow, column: &str) -> std::result::Result<bool, sqlx::Error> {
    Ok(row.try_get::<i64, _>(column)? != 0)
}

fn account_from_row(row: &AnyRow) -> std::result::Result<UserAccount, sqlx::Error> {
    Ok(UserAccount {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        nickname: row.try_get("nickname")?,
        nameplate: row.try_get("nameplate")?,
        information: row.try_get("information")?,
        ac_num: row.try_get("ac_num")?,
        submit_num: row.try_get("submit_num")?,
        is_admin: flag(row, "is_admin")?,
        is_show: flag(row, "is_show")?,
        public_email: flag(row, "public_email")?,
        prefer_dark_mode: flag(row, "prefer_dark_mode")?,
        sex: row.try_get("sex")?,
        rating: row.try_get("rating")?,
        register_time: row.try_get("register_time")?,
        is_banned: flag(row, "is_banned")?,
    })
}

fn map_write_error(err: sqlx::Error, account: &UserAccount, context: &str) -> crate::Error {
    if is_unique_violation(&err) {
        return BackendError::UsernameTaken {
            username: account.username.clone().unwrap_or_default(),
        }
        .into();
    }
    BackendError::SqlxError {
        reason: format!("{context}: {err}"),
        source: Some(err),
    }
    .into()
}

/// Get an account by id.
pub async fn get(backend: &SqlxBackend, id: UserId) -> Result<UserAccount> {
    let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE id = $1");
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(backend.pool())
        .await
        .sql_context("Failed to get account")?;

    match row {
        Some(row) => account_from_row(&row).sql_context("Failed to decode account"),
        None => Err(BackendError::AccountNotFound { id }.into()),
    }
}

/// Find the first account whose `column` equals `value`.
///
/// `column` is always one of the fixed lookup columns chosen by the caller.
pub async fn find_by(
    backend: &SqlxBackend,
    column: &'static str,
    value: &str,
) -> Result<Option<UserAccount>> {
    let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE {column} = $1 ORDER BY id LIMIT 1");
    let row = sqlx::query(&sql)
        .bind(value)
        .fetch_optional(backend.pool())
        .await
        .sql_context("Failed to look up account")?;

    row.map(|r| account_from_row(&r))
        .transpose()
        .sql_context("Failed to decode account")
}

/// Insert a new account; the stored id is assigned by the database.
pub async fn create(backend: &SqlxBackend, mut account: UserAccount) -> Result<UserAccount> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO users (username, email, nickname, nameplate, information, \
         ac_num, submit_num, is_admin, is_show, public_email, prefer_dark_mode, \
         sex, rating, register_time, is_banned) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
         RETURNING id",
    )
    .bind(account.username.clone())
    .bind(account.email.clone())
    .bind(account.nickname.clone())
    .bind(account.nameplate.clone())
    .bind(account.information.clone())
    .bind(account.ac_num)
    .bind(account.submit_num)
    .bind(i64::from(account.is_admin))
    .bind(i64::from(account.is_show))
    .bind(i64::from(account.public_email))
    .bind(i64::from(account.prefer_dark_mode))
    .bind(account.sex)
    .bind(account.rating)
    .bind(account.register_time)
    .bind(i64::from(account.is_banned))
    .fetch_one(backend.pool())
    .await
    .map_err(|e| map_write_error(e, &account, "Failed to create account"))?;

    account.id = id;
    Ok(account)
}

/// Overwrite every column of an existing account.
pub async fn save(backend: &SqlxBackend, account: &UserAccount) -> Result<()> {
    let result = sqlx::query(
        "UPDATE users SET username = $1, email = $2, nickname = $3, nameplate = $4, \
         information = $5, ac_num = $6, submit_num = $7, is_admin = $8, is_show = $9, \
         public_email = $10, prefer_dark_mode = $11, sex = $12, rating = $13, \
         register_time = $14, is_banned = $15 WHERE id = $16",
    )
    .bind(account.username.clone())
    .bind(account.email.clone())
    .bind(account.nickname.clone())
    .bind(account.nameplate.clone())
    .bind(account.information.clone())
    .bind(account.ac_num)
    .bind(account.submit_num)
    .bind(i64::from(account.is_admin))
    .bind(i64::from(account.is_show))
    .bind(i64::from(account.public_email))
    .bind(i64::from(account.prefer_dark_mode))
    .bind(account.sex)
    .bind(account.rating)
    .bind(account.register_time)
    .bind(i64::from(account.is_banned))
    .bind(account.id)
    .execute(backend.pool())
    .await
    .map_err(|e| map_write_error(e, account, "Failed to save account"))?;

    if result.rows_affected() == 0 {
        return Err(BackendError::AccountNotFound { id: account.id }.into());
    }
    Ok(())
}

/// Delete an account row.
pub async fn remove(backend: &SqlxBackend, id: UserId) -> Result<()> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(backend.pool())
        .await
        .sql_context("Failed to remove account")?;

    if result.rows_affected() == 0 {
        return Err(BackendError::AccountNotFound { id }.into());
    }
    Ok(())
}
