use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::question::AnswerKey;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionStateError {
    #[error("question is submitted and can no longer change")]
    Locked,
}

/// Progress of a single question within a session.
///
/// `Submitted` is terminal. Marking for review is tracked separately and does
/// not change the status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionStatus {
    Unvisited,
    Visited,
    Answered,
    Submitted,
}

impl QuestionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unvisited => "unvisited",
            Self::Visited => "visited",
            Self::Answered => "answered",
            Self::Submitted => "submitted",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "unvisited" => Some(Self::Unvisited),
            "visited" => Some(Self::Visited),
            "answered" => Some(Self::Answered),
            "submitted" => Some(Self::Submitted),
            _ => None,
        }
    }
}

/// Per-question answer, flag and submission state.
///
/// Submission is derived from `status`, so a submitted state can never carry a
/// non-terminal status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionState {
    selected_answer: Option<AnswerKey>,
    is_marked_for_review: bool,
    status: QuestionStatus,
}

impl Default for QuestionState {
    fn default() -> Self {
        Self::new()
    }
}

impl QuestionState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            selected_answer: None,
            is_marked_for_review: false,
            status: QuestionStatus::Unvisited,
        }
    }

    #[must_use]
    pub fn selected_answer(&self) -> Option<&AnswerKey> {
        self.selected_answer.as_ref()
    }

    #[must_use]
    pub fn is_marked_for_review(&self) -> bool {
        self.is_marked_for_review
    }

    #[must_use]
    pub fn status(&self) -> QuestionStatus {
        self.status
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.status == QuestionStatus::Submitted
    }

    /// Record that the question has been shown. Only moves `Unvisited` forward.
    pub fn visit(&mut self) {
        if self.status == QuestionStatus::Unvisited {
            self.status = QuestionStatus::Visited;
        }
    }

    /// # Errors
    ///
    /// Returns `QuestionStateError::Locked` once the question is submitted.
    pub fn select_answer(&mut self, key: AnswerKey) -> Result<(), QuestionStateError> {
        if self.is_submitted() {
            return Err(QuestionStateError::Locked);
        }
        self.selected_answer = Some(key);
        self.status = QuestionStatus::Answered;
        Ok(())
    }

    /// Flip the review flag and return its new value.
    ///
    /// # Errors
    ///
    /// Returns `QuestionStateError::Locked` once the question is submitted.
    pub fn toggle_mark_for_review(&mut self) -> Result<bool, QuestionStateError> {
        if self.is_submitted() {
            return Err(QuestionStateError::Locked);
        }
        self.is_marked_for_review = !self.is_marked_for_review;
        Ok(self.is_marked_for_review)
    }

    /// Lock the question. Returns `false` if it was already submitted.
    pub fn submit(&mut self) -> bool {
        if self.is_submitted() {
            return false;
        }
        self.status = QuestionStatus::Submitted;
        true
    }
}
