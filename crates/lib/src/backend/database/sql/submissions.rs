//! Submission log queries for SQL backends.

use sqlx::any::{AnyArguments, AnyRow};
use sqlx::query::Query;
use sqlx::{Any, Row};

use super::{SqlxBackend, SqlxResultExt};
use crate::Result;
use crate::types::{ProblemId, SubmissionFilter, SubmissionRecord, TypeFilter, UserId};

/// Render a filter as a WHERE clause with sequential placeholders.
fn where_clause(filter: &SubmissionFilter) -> String {
    let mut clause = "user_id = $1".to_string();
    let mut n = 1;
    if filter.status.is_some() {
        n += 1;
        clause.push_str(&format!(" AND status = ${n}"));
    }
    if let Some(type_filter) = filter.submission_type {
        n += 1;
        let op = match type_filter {
            TypeFilter::Is(_) => "=",
            TypeFilter::Not(_) => "<>",
        };
        clause.push_str(&format!(" AND type {op} ${n}"));
    }
    clause
}

/// Bind filter values in the order `where_clause` numbered them.
fn bind_filter<'q>(
    mut query: Query<'q, Any, AnyArguments<'q>>,
    filter: &SubmissionFilter,
) -> Query<'q, Any, AnyArguments<'q>> {
    query = query.bind(filter.user_id);
    if let Some(status) = &filter.status {
        query = query.bind(status.clone());
    }
    if let Some(TypeFilter::Is(value) | TypeFilter::Not(value)) = filter.submission_type {
        query = query.bind(value);
    }
    query
}

fn submission_from_row(row: &AnyRow) -> std::result::Result<SubmissionRecord, sqlx::Error> {
    Ok(SubmissionRecord {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        problem_id: row.try_get("problem_id")?,
        status: row.try_get("status")?,
        submission_type: row.try_get("type")?,
        submit_time: row.try_get("submit_time")?,
        language: row.try_get("language")?,
    })
}

/// Append a record to the log. Used by seeding and tests.
pub async fn insert(backend: &SqlxBackend, mut record: SubmissionRecord) -> Result<SubmissionRecord> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO judge_states (user_id, problem_id, status, type, submit_time, language) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
    )
    .bind(record.user_id)
    .bind(record.problem_id)
    .bind(record.status.clone())
    .bind(record.submission_type)
    .bind(record.submit_time)
    .bind(record.language.clone())
    .fetch_one(backend.pool())
    .await
    .sql_context("Failed to insert submission")?;

    record.id = id;
    Ok(record)
}

async fn count_with(backend: &SqlxBackend, select: &str, filter: &SubmissionFilter) -> Result<u64> {
    let sql = format!("SELECT {select} FROM judge_states WHERE {}", where_clause(filter));
    let row = bind_filter(sqlx::query(&sql), filter)
        .fetch_one(backend.pool())
        .await
        .sql_context("Failed to count submissions")?;
    let count: i64 = row.try_get(0).sql_context("Failed to decode count")?;
    Ok(count.max(0) as u64)
}

/// Count submissions matching a filter.
pub async fn count(backend: &SqlxBackend, filter: &SubmissionFilter) -> Result<u64> {
    count_with(backend, "COUNT(*)", filter).await
}

/// Count distinct problems among submissions matching a filter.
pub async fn count_distinct_problems(
    backend: &SqlxBackend,
    filter: &SubmissionFilter,
) -> Result<u64> {
    count_with(backend, "COUNT(DISTINCT problem_id)", filter).await
}

/// Distinct problem ids matching a filter, ascending.
pub async fn distinct_problem_ids(
    backend: &SqlxBackend,
    filter: &SubmissionFilter,
) -> Result<Vec<ProblemId>> {
    let sql = format!(
        "SELECT DISTINCT problem_id FROM judge_states WHERE {} ORDER BY problem_id ASC",
        where_clause(filter)
    );
    let rows = bind_filter(sqlx::query(&sql), filter)
        .fetch_all(backend.pool())
        .await
        .sql_context("Failed to list accepted problems")?;

    rows.iter()
        .map(|row| row.try_get::<i64, _>(0))
        .collect::<std::result::Result<Vec<_>, _>>()
        .sql_context("Failed to decode problem id")
}

/// The most recent submission of a user; ties on time go to the highest id.
pub async fn latest(backend: &SqlxBackend, user_id: UserId) -> Result<Option<SubmissionRecord>> {
    let row = sqlx::query(
        "SELECT id, user_id, problem_id, status, type, submit_time, language \
         FROM judge_states WHERE user_id = $1 \
         ORDER BY submit_time DESC, id DESC LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(backend.pool())
    .await
    .sql_context("Failed to get latest submission")?;

    row.map(|r| submission_from_row(&r))
        .transpose()
        .sql_context("Failed to decode submission")
}
