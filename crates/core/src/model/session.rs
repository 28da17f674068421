use std::collections::HashSet;
use std::fmt;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::QuestionId;

/// Upper bound for a configured countdown (24 hours).
pub const MAX_DURATION_MILLIS: u64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionConfigError {
    #[error("a session needs at least one question")]
    NoQuestions,

    #[error("question {0} is listed more than once")]
    DuplicateQuestion(QuestionId),

    #[error("test mode requires a countdown duration")]
    MissingDuration,

    #[error("duration must be between 1 ms and {MAX_DURATION_MILLIS} ms, got {0}")]
    InvalidDuration(u64),

    #[error("unknown session mode: {0}")]
    UnknownMode(String),
}

/// Whether the run is a timed, locking test or a free study pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    Test,
    Study,
}

impl SessionMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Test => "test",
            Self::Study => "study",
        }
    }

    /// # Errors
    ///
    /// Returns `SessionConfigError::UnknownMode` for anything other than `test`/`study`.
    pub fn parse(raw: &str) -> Result<Self, SessionConfigError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "test" => Ok(Self::Test),
            "study" => Ok(Self::Study),
            other => Err(SessionConfigError::UnknownMode(other.to_string())),
        }
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a session reached its terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// The user submitted the whole session.
    Submitted,
    /// The user left before finishing.
    UserExit,
    /// The countdown reached zero.
    TimeExpired,
}

impl EndReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::UserExit => "user_exit",
            Self::TimeExpired => "time_expired",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "submitted" => Some(Self::Submitted),
            "user_exit" => Some(Self::UserExit),
            "time_expired" => Some(Self::TimeExpired),
            _ => None,
        }
    }
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unvalidated session setup as chosen on the practice screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfigDraft {
    pub mode: SessionMode,
    pub duration_millis: Option<u64>,
    pub question_ids: Vec<QuestionId>,
}

impl SessionConfigDraft {
    #[must_use]
    pub fn test(duration_millis: u64, question_ids: Vec<QuestionId>) -> Self {
        Self {
            mode: SessionMode::Test,
            duration_millis: Some(duration_millis),
            question_ids,
        }
    }

    #[must_use]
    pub fn study(question_ids: Vec<QuestionId>) -> Self {
        Self {
            mode: SessionMode::Study,
            duration_millis: None,
            question_ids,
        }
    }

    /// # Errors
    ///
    /// Returns `SessionConfigError` when no questions are listed, an id repeats,
    /// or the duration is missing (test mode) or out of range.
    pub fn validate(self) -> Result<SessionConfig, SessionConfigError> {
        if self.question_ids.is_empty() {
            return Err(SessionConfigError::NoQuestions);
        }
        let mut seen = HashSet::with_capacity(self.question_ids.len());
        for id in &self.question_ids {
            if !seen.insert(*id) {
                return Err(SessionConfigError::DuplicateQuestion(*id));
            }
        }

        match (self.mode, self.duration_millis) {
            (SessionMode::Test, None) => return Err(SessionConfigError::MissingDuration),
            (_, Some(ms)) if ms == 0 || ms > MAX_DURATION_MILLIS => {
                return Err(SessionConfigError::InvalidDuration(ms));
            }
            _ => {}
        }

        Ok(SessionConfig {
            mode: self.mode,
            duration_millis: self.duration_millis,
            question_ids: self.question_ids,
        })
    }
}

/// Validated session configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    mode: SessionMode,
    duration_millis: Option<u64>,
    question_ids: Vec<QuestionId>,
}

impl SessionConfig {
    #[must_use]
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    /// Countdown length; `None` means the session is untimed.
    #[must_use]
    pub fn duration_millis(&self) -> Option<u64> {
        self.duration_millis
    }

    #[must_use]
    pub fn duration(&self) -> Option<Duration> {
        self.duration_millis
            .and_then(|ms| i64::try_from(ms).ok())
            .map(Duration::milliseconds)
    }

    #[must_use]
    pub fn question_ids(&self) -> &[QuestionId] {
        &self.question_ids
    }

    /// Returns the config with its question order replaced.
    ///
    /// The new order must be a permutation of the current ids; anything else is ignored.
    #[must_use]
    pub fn with_question_order(mut self, ordered: Vec<QuestionId>) -> Self {
        let current: HashSet<_> = self.question_ids.iter().copied().collect();
        let next: HashSet<_> = ordered.iter().copied().collect();
        if ordered.len() == self.question_ids.len() && current == next {
            self.question_ids = ordered;
        }
        self
    }
}
