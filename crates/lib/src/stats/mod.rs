//! Submission statistics derived from the judge's submission log.
//!
//! The log is owned by the judging pipeline; everything here only reads it.
//! Contest submissions (`type == 1`) never count towards a user's general
//! statistics.

use std::{fmt, sync::Arc};

use tracing::{debug, info};

use crate::{
    ProblemId, Result, UserId,
    backend::BackendImpl,
    cache::AccountCache,
    constants::{
        STATUS_ACCEPTED, STATUS_COMPILE_ERROR, STATUS_FILE_ERROR, STATUS_MEMORY_LIMIT_EXCEEDED,
        STATUS_OUTPUT_LIMIT_EXCEEDED, STATUS_RUNTIME_ERROR, STATUS_TIME_LIMIT_EXCEEDED,
        STATUS_WRONG_ANSWER,
    },
    lock::{LockKey, LockService},
    types::{SubmissionFilter, TypeFilter},
};

/// Display categories of the status histogram.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StatusCategory {
    Accepted,
    WrongAnswer,
    RuntimeError,
    TimeLimitExceeded,
    MemoryLimitExceeded,
    CompileError,
}

impl StatusCategory {
    /// Every category, in display order.
    pub const ALL: [StatusCategory; 6] = [
        StatusCategory::Accepted,
        StatusCategory::WrongAnswer,
        StatusCategory::RuntimeError,
        StatusCategory::TimeLimitExceeded,
        StatusCategory::MemoryLimitExceeded,
        StatusCategory::CompileError,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            StatusCategory::Accepted => STATUS_ACCEPTED,
            StatusCategory::WrongAnswer => STATUS_WRONG_ANSWER,
            StatusCategory::RuntimeError => STATUS_RUNTIME_ERROR,
            StatusCategory::TimeLimitExceeded => STATUS_TIME_LIMIT_EXCEEDED,
            StatusCategory::MemoryLimitExceeded => STATUS_MEMORY_LIMIT_EXCEEDED,
            StatusCategory::CompileError => STATUS_COMPILE_ERROR,
        }
    }

    /// Raw judge statuses counted under this category.
    pub fn raw_statuses(&self) -> &'static [&'static str] {
        match self {
            StatusCategory::Accepted => &[STATUS_ACCEPTED],
            StatusCategory::WrongAnswer => &[
                STATUS_WRONG_ANSWER,
                STATUS_FILE_ERROR,
                STATUS_OUTPUT_LIMIT_EXCEEDED,
            ],
            StatusCategory::RuntimeError => &[STATUS_RUNTIME_ERROR],
            StatusCategory::TimeLimitExceeded => &[STATUS_TIME_LIMIT_EXCEEDED],
            StatusCategory::MemoryLimitExceeded => &[STATUS_MEMORY_LIMIT_EXCEEDED],
            StatusCategory::CompileError => &[STATUS_COMPILE_ERROR],
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for StatusCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-category submission counts. Every category is always present.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatusHistogram {
    counts: [u64; StatusCategory::ALL.len()],
}

impl StatusHistogram {
    pub fn get(&self, category: StatusCategory) -> u64 {
        self.counts[category.index()]
    }

    pub fn set(&mut self, category: StatusCategory, count: u64) {
        self.counts[category.index()] = count;
    }

    /// Sum over all categories.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// `(category, count)` pairs in display order.
    pub fn iter(&self) -> impl Iterator<Item = (StatusCategory, u64)> + '_ {
        StatusCategory::ALL.iter().map(|c| (*c, self.get(*c)))
    }
}

/// Derives statistics from the submission log and refreshes the cached
/// counters on account rows.
#[derive(Clone)]
pub struct StatsAggregator {
    backend: Arc<dyn BackendImpl>,
    cache: Arc<dyn AccountCache>,
    locks: LockService,
}

impl fmt::Debug for StatsAggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatsAggregator")
            .field("locks", &self.locks)
            .finish_non_exhaustive()
    }
}

fn accepted_filter(user_id: UserId) -> SubmissionFilter {
    SubmissionFilter::for_user(user_id)
        .with_status(STATUS_ACCEPTED)
        .with_type(TypeFilter::NON_CONTEST)
}

impl StatsAggregator {
    pub fn new(
        backend: Arc<dyn BackendImpl>,
        cache: Arc<dyn AccountCache>,
        locks: LockService,
    ) -> Self {
        Self {
            backend,
            cache,
            locks,
        }
    }

    /// Recompute `ac_num` and `submit_num` and persist them on the account.
    ///
    /// Runs under the `(SubmitRefresh, user_id)` lock, so concurrent
    /// refreshes of one user apply one after another. The row is rewritten
    /// and evicted under `(AccountLifecycle, user_id)`. Returns
    /// `(ac_num, submit_num)`.
    pub async fn refresh_counters(&self, user_id: UserId) -> Result<(i64, i64)> {
        let _guard = self.locks.lock(LockKey::submit_refresh(user_id)).await?;

        let ac_num = self
            .backend
            .count_distinct_problems(&accepted_filter(user_id))
            .await?;
        let submit_num = self
            .backend
            .count_submissions(
                &SubmissionFilter::for_user(user_id).with_type(TypeFilter::NON_CONTEST),
            )
            .await?;

        // Same lock the account manager fills the cache under
        let _lifecycle = self
            .locks
            .lock(LockKey::account_lifecycle(user_id))
            .await?;
        let mut account = self.backend.get_account(user_id).await?;
        account.ac_num = ac_num as i64;
        account.submit_num = submit_num as i64;
        self.backend.save_account(&account).await?;
        // The cached row still holds the old counters
        self.cache.evict(user_id).await?;

        info!(user_id, ac_num, submit_num, "Refreshed submission counters");
        Ok((account.ac_num, account.submit_num))
    }

    /// Distinct accepted problem ids, ascending. Contest submissions excluded.
    pub async fn accepted_problem_ids(&self, user_id: UserId) -> Result<Vec<ProblemId>> {
        self.backend
            .distinct_problem_ids(&accepted_filter(user_id))
            .await
    }

    /// Per-category counts over the user's ordinary (`type == 0`) submissions.
    pub async fn status_histogram(&self, user_id: UserId) -> Result<StatusHistogram> {
        let mut histogram = StatusHistogram::default();
        for category in StatusCategory::ALL {
            let mut count = 0;
            for status in category.raw_statuses() {
                count += self
                    .backend
                    .count_submissions(
                        &SubmissionFilter::for_user(user_id)
                            .with_status(*status)
                            .with_type(TypeFilter::NORMAL),
                    )
                    .await?;
            }
            histogram.set(category, count);
        }
        debug!(user_id, total = histogram.total(), "Computed status histogram");
        Ok(histogram)
    }

    /// Language of the most recent submission, if any.
    pub async fn last_submission_language(&self, user_id: UserId) -> Result<Option<String>> {
        Ok(self
            .backend
            .latest_submission(user_id)
            .await?
            .and_then(|s| s.language))
    }
}
