//! Core data types shared by the managers and their collaborators

use serde::{Deserialize, Serialize};

use crate::constants::{SUBMISSION_TYPE_CONTEST, SUBMISSION_TYPE_NORMAL};

/// Numeric identity of a user account.
pub type UserId = i64;

/// Numeric identity of a problem in the submission log.
pub type ProblemId = i64;

/// A user account row.
///
/// `ac_num` and `submit_num` are cached copies of what the statistics
/// aggregator derives from the submission log. They are only refreshed on
/// demand and may lag behind newly judged submissions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    /// Primary key, assigned by the backend on creation
    pub id: UserId,

    /// Unique login name
    pub username: Option<String>,

    pub email: Option<String>,

    /// Display name
    pub nickname: Option<String>,

    pub nameplate: Option<String>,

    /// Free-form profile text (markdown source)
    pub information: Option<String>,

    /// Distinct accepted problems, excluding contest submissions
    pub ac_num: i64,

    /// Submissions made outside contests
    pub submit_num: i64,

    pub is_admin: bool,

    /// Whether the account is listed publicly
    pub is_show: bool,

    pub public_email: bool,

    pub prefer_dark_mode: bool,

    pub sex: Option<i64>,

    pub rating: Option<i64>,

    /// Registration timestamp (Unix seconds)
    pub register_time: Option<i64>,

    pub is_banned: bool,
}

impl UserAccount {
    /// Create an unsaved account with the given username.
    ///
    /// The id is left at 0; backends assign the real id in `create_account`.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: 0,
            username: Some(username.into()),
            email: None,
            nickname: None,
            nameplate: None,
            information: None,
            ac_num: 0,
            submit_num: 0,
            is_admin: false,
            is_show: true,
            public_email: true,
            prefer_dark_mode: false,
            sex: None,
            rating: None,
            register_time: Some(chrono::Utc::now().timestamp()),
            is_banned: false,
        }
    }

    /// Set the email address (builder style).
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set the admin flag (builder style).
    pub fn with_admin(mut self, is_admin: bool) -> Self {
        self.is_admin = is_admin;
        self
    }
}

/// A single (user, privilege) association.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PrivilegeGrant {
    pub user_id: UserId,
    pub privilege: String,
}

/// Persistence-side tracking record for an uploaded file.
///
/// The file itself lives in file storage; this record only mirrors its
/// name and size so that relationship queries can be answered from the
/// relational store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: i64,
    /// Owner tag, `upload-by-user-<id>` for user uploads
    pub tag: String,
    pub filename: String,
    pub size: u64,
}

/// One judged (or pending) submission from the submission log.
///
/// The core only ever reads these.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub id: i64,
    pub user_id: UserId,
    pub problem_id: ProblemId,
    /// Raw judge status such as `"Accepted"` or `"Wrong Answer"`
    pub status: String,
    /// See [`SUBMISSION_TYPE_NORMAL`] and [`SUBMISSION_TYPE_CONTEST`]
    pub submission_type: i64,
    /// Submission timestamp (Unix seconds)
    pub submit_time: i64,
    pub language: Option<String>,
}

impl SubmissionRecord {
    /// Whether this submission belongs to a timed contest.
    pub fn is_contest(&self) -> bool {
        self.submission_type == SUBMISSION_TYPE_CONTEST
    }
}

/// Constraint on the submission type column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeFilter {
    /// `type = n`
    Is(i64),
    /// `type != n`
    Not(i64),
}

impl TypeFilter {
    /// Every submission that is not a contest submission.
    pub const NON_CONTEST: TypeFilter = TypeFilter::Not(SUBMISSION_TYPE_CONTEST);

    /// Only ordinary submissions.
    pub const NORMAL: TypeFilter = TypeFilter::Is(SUBMISSION_TYPE_NORMAL);

    /// Check a raw type value against this filter.
    pub fn matches(&self, submission_type: i64) -> bool {
        match self {
            TypeFilter::Is(n) => submission_type == *n,
            TypeFilter::Not(n) => submission_type != *n,
        }
    }
}

/// Filter over the submission log used by count and distinct queries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmissionFilter {
    pub user_id: UserId,
    pub status: Option<String>,
    pub submission_type: Option<TypeFilter>,
}

impl SubmissionFilter {
    /// All submissions of a user.
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id,
            status: None,
            submission_type: None,
        }
    }

    /// Restrict to one raw status.
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Restrict the submission type.
    pub fn with_type(mut self, filter: TypeFilter) -> Self {
        self.submission_type = Some(filter);
        self
    }

    /// Evaluate the filter against a record.
    pub fn matches(&self, record: &SubmissionRecord) -> bool {
        record.user_id == self.user_id
            && self.status.as_deref().is_none_or(|s| record.status == s)
            && self
                .submission_type
                .is_none_or(|t| t.matches(record.submission_type))
    }
}
