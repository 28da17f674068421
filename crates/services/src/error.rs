//! Shared error types for the services crate.

use thiserror::Error;

use exam_core::model::{AnswerKey, SessionConfigError, SummaryError};
use storage::repository::StorageError;

/// Rejected store operations.
///
/// These signal a race between what the UI offered and what the store allows.
/// No state changes when one is returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionStoreError {
    #[error("question {index} is submitted and locked")]
    LockedQuestion { index: usize },
    #[error("question {index} cannot be entered")]
    NavigationBlocked { index: usize },
    #[error("session has already ended")]
    SessionEnded,
    #[error("index {index} is out of range for {len} questions")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("question {index} has no option {key}")]
    UnknownOption { index: usize, key: AnswerKey },
    #[error("per-question submission is only available in test mode")]
    SubmissionUnavailable,
    #[error(transparent)]
    Grading(#[from] SummaryError),
}

/// Errors emitted by session services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no questions available for session")]
    Empty,
    #[error("session has not ended yet")]
    NotEnded,
    #[error("expected {expected} questions, question bank returned {found}")]
    MissingQuestions { expected: usize, found: usize },
    #[error(transparent)]
    Config(#[from] SessionConfigError),
    #[error(transparent)]
    Store(#[from] SessionStoreError),
    #[error(transparent)]
    Summary(#[from] SummaryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ResultsClient`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ResultsClientError {
    #[error("results endpoint is not configured")]
    Disabled,
    #[error("invalid results base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("results request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
