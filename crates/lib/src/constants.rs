//! Constants used throughout the Roster library.
//!
//! This module provides central definitions for the raw strings and numeric
//! codes shared between the core and its collaborators, especially the
//! judge status names stored in the submission log.

/// Submission type of an ordinary (practice) submission.
pub const SUBMISSION_TYPE_NORMAL: i64 = 0;

/// Submission type of a submission made inside a timed contest.
pub const SUBMISSION_TYPE_CONTEST: i64 = 1;

/// Raw judge status for an accepted submission.
pub const STATUS_ACCEPTED: &str = "Accepted";

/// Raw judge status for a wrong answer.
pub const STATUS_WRONG_ANSWER: &str = "Wrong Answer";

/// Raw judge status for a missing or unreadable output file.
pub const STATUS_FILE_ERROR: &str = "File Error";

/// Raw judge status for output exceeding its size limit.
pub const STATUS_OUTPUT_LIMIT_EXCEEDED: &str = "Output Limit Exceeded";

/// Raw judge status for a crashed program.
pub const STATUS_RUNTIME_ERROR: &str = "Runtime Error";

/// Raw judge status for a program exceeding its time limit.
pub const STATUS_TIME_LIMIT_EXCEEDED: &str = "Time Limit Exceeded";

/// Raw judge status for a program exceeding its memory limit.
pub const STATUS_MEMORY_LIMIT_EXCEEDED: &str = "Memory Limit Exceeded";

/// Raw judge status for a submission that failed to compile.
pub const STATUS_COMPILE_ERROR: &str = "Compile Error";

/// Privilege that allows editing other users' profiles.
pub const PRIVILEGE_MANAGE_USER: &str = "manage_user";

/// Subdirectory of the upload root holding per-user files.
pub const USER_UPLOAD_DIR: &str = "user-upload";

/// Prefix of the tracking-record tag for a user's uploaded files.
pub const UPLOAD_TAG_PREFIX: &str = "upload-by-user-";

/// Build the tracking-record tag for files uploaded by `user_id`.
pub fn upload_tag(user_id: i64) -> String {
    format!("{UPLOAD_TAG_PREFIX}{user_id}")
}
