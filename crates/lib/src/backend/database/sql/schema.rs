//! SQL schema definitions and migrations.
//!
//! This module contains the database schema used by SQL backends.
//! Apart from the auto-assigned id columns the schema is portable between
//! SQLite and Postgres; [`create_tables`] renders the dialect-specific parts.
//!
//! # Migration System
//!
//! The migration system uses code-based migrations rather than SQL files to handle
//! dialect differences between SQLite and PostgreSQL. Each migration is a function
//! that receives the backend and can execute database-specific SQL as needed.
//!
//! ## Adding a New Migration
//!
//! 1. Increment `SCHEMA_VERSION`
//! 2. Add a new `migrate_vN_to_vM` async function
//! 3. Add the migration to the match statement in `run_migration`

use super::{DbKind, SqlxBackend, SqlxResultExt};
use crate::Result;
use crate::backend::errors::BackendError;

/// Current schema version.
///
/// Increment this when making schema changes that require migration.
pub const SCHEMA_VERSION: i64 = 1;

/// Column definition for an auto-assigned 64-bit primary key.
fn id_column(kind: DbKind) -> &'static str {
    match kind {
        DbKind::Sqlite => "id INTEGER PRIMARY KEY AUTOINCREMENT",
        DbKind::Postgres => "id BIGSERIAL PRIMARY KEY",
    }
}

/// SQL statements to create the schema tables.
///
/// Boolean flags are stored as BIGINT 0/1 so the same decoding works
/// through `AnyPool` on both databases.
pub fn create_tables(kind: DbKind) -> Vec<String> {
    let id = id_column(kind);
    vec![
        "CREATE TABLE IF NOT EXISTS schema_version (
            version BIGINT PRIMARY KEY
        )"
        .to_string(),
        format!(
            "CREATE TABLE IF NOT EXISTS users (
                {id},
                username TEXT UNIQUE,
                email TEXT,
                nickname TEXT,
                nameplate TEXT,
                information TEXT,
                ac_num BIGINT NOT NULL DEFAULT 0,
                submit_num BIGINT NOT NULL DEFAULT 0,
                is_admin BIGINT NOT NULL DEFAULT 0,
                is_show BIGINT NOT NULL DEFAULT 1,
                public_email BIGINT NOT NULL DEFAULT 1,
                prefer_dark_mode BIGINT NOT NULL DEFAULT 0,
                sex BIGINT,
                rating BIGINT,
                register_time BIGINT,
                is_banned BIGINT NOT NULL DEFAULT 0
            )"
        ),
        "CREATE TABLE IF NOT EXISTS user_privileges (
            user_id BIGINT NOT NULL,
            privilege TEXT NOT NULL,
            PRIMARY KEY (user_id, privilege)
        )"
        .to_string(),
        // The submission log; only ever read by the core
        format!(
            "CREATE TABLE IF NOT EXISTS judge_states (
                {id},
                user_id BIGINT NOT NULL,
                problem_id BIGINT NOT NULL,
                status TEXT NOT NULL,
                type BIGINT NOT NULL DEFAULT 0,
                submit_time BIGINT NOT NULL,
                language TEXT
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS files (
                {id},
                tag TEXT NOT NULL,
                filename TEXT NOT NULL,
                size BIGINT NOT NULL,
                UNIQUE (tag, filename)
            )"
        ),
    ]
}

/// SQL statements to create indexes.
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_users_email ON users(email)",
    // Statistics queries filter by user, then status or type
    "CREATE INDEX IF NOT EXISTS idx_judge_states_user_status ON judge_states(user_id, status)",
    "CREATE INDEX IF NOT EXISTS idx_judge_states_user_time ON judge_states(user_id, submit_time)",
];

/// Initialize the database schema.
///
/// Creates tables and indexes if they don't exist, and handles migrations
/// if the schema version has changed.
pub async fn initialize(backend: &SqlxBackend) -> Result<()> {
    let pool = backend.pool();

    for statement in create_tables(backend.kind()) {
        sqlx::query(&statement)
            .execute(pool)
            .await
            .map_err(|e| BackendError::SqlxError {
                reason: format!("Schema creation failed: {e} - SQL: {statement}"),
                source: Some(e),
            })?;
    }

    let row: Option<(i64,)> = sqlx::query_as("SELECT version FROM schema_version")
        .fetch_optional(pool)
        .await
        .sql_context("Failed to check schema version")?;

    match row {
        None => {
            sqlx::query("INSERT INTO schema_version (version) VALUES ($1)")
                .bind(SCHEMA_VERSION)
                .execute(pool)
                .await
                .sql_context("Failed to initialize schema version")?;
        }
        Some((current,)) if current < SCHEMA_VERSION => {
            migrate(backend, current, SCHEMA_VERSION).await?;
        }
        Some((current,)) if current > SCHEMA_VERSION => {
            return Err(BackendError::SqlxError {
                reason: format!(
                    "Database schema v{current} is newer than supported v{SCHEMA_VERSION}"
                ),
                source: None,
            }
            .into());
        }
        Some(_) => {}
    }

    for statement in CREATE_INDEXES {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| BackendError::SqlxError {
                reason: format!("Index creation failed: {e} - SQL: {statement}"),
                source: Some(e),
            })?;
    }

    Ok(())
}

/// Run migrations sequentially from one schema version to another.
async fn migrate(backend: &SqlxBackend, from: i64, to: i64) -> Result<()> {
    tracing::info!(from, to, "Starting SQL schema migration");

    let mut current = from;
    while current < to {
        let next = current + 1;
        run_migration(backend, current, next).await?;

        sqlx::query("UPDATE schema_version SET version = $1")
            .bind(next)
            .execute(backend.pool())
            .await
            .sql_context(&format!("Failed to update schema version to {next}"))?;

        tracing::info!(version = next, "Migration completed");
        current = next;
    }

    Ok(())
}

/// Execute a single migration step.
async fn run_migration(backend: &SqlxBackend, from: i64, to: i64) -> Result<()> {
    // No migrations exist yet; version 1 is the first schema.
    let _ = backend;

    Err(BackendError::SqlxError {
        reason: format!(
            "Unknown migration path: v{from} to v{to}. \
             This likely means SCHEMA_VERSION was incremented without adding a migration."
        ),
        source: None,
    }
    .into())
}
