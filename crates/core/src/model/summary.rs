use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{QuestionId, SessionId};
use crate::model::question::{AnswerKey, Question};
use crate::model::question_state::{QuestionState, QuestionStatus};
use crate::model::session::{EndReason, SessionMode};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SummaryError {
    #[error("ended_at is before started_at")]
    InvalidTimeRange,

    #[error("{questions} questions but {states} question states")]
    LengthMismatch { questions: usize, states: usize },

    #[error("too many questions for a single session: {len}")]
    TooManyQuestions { len: usize },

    #[error("stored counts do not match per-question outcomes")]
    CountMismatch,
}

/// Grading result for one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Correctness {
    Correct,
    Incorrect,
    Unanswered,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOutcome {
    pub question_id: QuestionId,
    pub status: QuestionStatus,
    pub selected_answer: Option<AnswerKey>,
    pub correct_answer: AnswerKey,
    pub is_marked_for_review: bool,
    pub correctness: Correctness,
}

impl QuestionOutcome {
    #[must_use]
    pub fn grade(question: &Question, state: &QuestionState) -> Self {
        let correctness = match state.selected_answer() {
            None => Correctness::Unanswered,
            Some(key) if question.is_correct(key) => Correctness::Correct,
            Some(_) => Correctness::Incorrect,
        };
        Self {
            question_id: question.id(),
            status: state.status(),
            selected_answer: state.selected_answer().cloned(),
            correct_answer: question.correct_answer().clone(),
            is_marked_for_review: state.is_marked_for_review(),
            correctness,
        }
    }
}

/// End-of-session result handed to the results view and the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    session_id: SessionId,
    mode: SessionMode,
    end_reason: EndReason,
    started_at: DateTime<Utc>,
    ended_at: DateTime<Utc>,
    time_taken_millis: u64,
    questions_answered: u32,
    correct_count: u32,
    incorrect_count: u32,
    per_question: Vec<QuestionOutcome>,
}

struct Counts {
    answered: u32,
    correct: u32,
    incorrect: u32,
}

fn count(outcomes: &[QuestionOutcome]) -> Counts {
    let mut counts = Counts {
        answered: 0,
        correct: 0,
        incorrect: 0,
    };
    for outcome in outcomes {
        // A question counts as answered once the user has opened it.
        if outcome.status != QuestionStatus::Unvisited {
            counts.answered = counts.answered.saturating_add(1);
        }
        match outcome.correctness {
            Correctness::Correct => counts.correct = counts.correct.saturating_add(1),
            Correctness::Incorrect => counts.incorrect = counts.incorrect.saturating_add(1),
            Correctness::Unanswered => {}
        }
    }
    counts
}

impl SessionSummary {
    /// Grade a finished session. This is the only place answers are compared
    /// against the answer key.
    ///
    /// # Errors
    ///
    /// Returns `SummaryError::LengthMismatch` if questions and states differ in length,
    /// `SummaryError::InvalidTimeRange` if `ended_at < started_at`.
    #[allow(clippy::too_many_arguments)]
    pub fn grade(
        session_id: SessionId,
        mode: SessionMode,
        end_reason: EndReason,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        time_taken_millis: u64,
        questions: &[Question],
        states: &[QuestionState],
    ) -> Result<Self, SummaryError> {
        if questions.len() != states.len() {
            return Err(SummaryError::LengthMismatch {
                questions: questions.len(),
                states: states.len(),
            });
        }
        if u32::try_from(questions.len()).is_err() {
            return Err(SummaryError::TooManyQuestions {
                len: questions.len(),
            });
        }
        if ended_at < started_at {
            return Err(SummaryError::InvalidTimeRange);
        }

        let per_question: Vec<_> = questions
            .iter()
            .zip(states)
            .map(|(question, state)| QuestionOutcome::grade(question, state))
            .collect();
        let counts = count(&per_question);

        Ok(Self {
            session_id,
            mode,
            end_reason,
            started_at,
            ended_at,
            time_taken_millis,
            questions_answered: counts.answered,
            correct_count: counts.correct,
            incorrect_count: counts.incorrect,
            per_question,
        })
    }

    /// Rehydrate a summary from storage.
    ///
    /// # Errors
    ///
    /// Returns `SummaryError::InvalidTimeRange` or `SummaryError::CountMismatch`
    /// if the stored row is inconsistent.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        session_id: SessionId,
        mode: SessionMode,
        end_reason: EndReason,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        time_taken_millis: u64,
        questions_answered: u32,
        correct_count: u32,
        incorrect_count: u32,
        per_question: Vec<QuestionOutcome>,
    ) -> Result<Self, SummaryError> {
        if ended_at < started_at {
            return Err(SummaryError::InvalidTimeRange);
        }
        let counts = count(&per_question);
        if counts.answered != questions_answered
            || counts.correct != correct_count
            || counts.incorrect != incorrect_count
        {
            return Err(SummaryError::CountMismatch);
        }

        Ok(Self {
            session_id,
            mode,
            end_reason,
            started_at,
            ended_at,
            time_taken_millis,
            questions_answered,
            correct_count,
            incorrect_count,
            per_question,
        })
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    #[must_use]
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    #[must_use]
    pub fn end_reason(&self) -> EndReason {
        self.end_reason
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn ended_at(&self) -> DateTime<Utc> {
        self.ended_at
    }

    #[must_use]
    pub fn time_taken_millis(&self) -> u64 {
        self.time_taken_millis
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.per_question.len()
    }

    /// Questions the user opened at least once (status other than `unvisited`).
    #[must_use]
    pub fn questions_answered(&self) -> u32 {
        self.questions_answered
    }

    #[must_use]
    pub fn correct_count(&self) -> u32 {
        self.correct_count
    }

    #[must_use]
    pub fn incorrect_count(&self) -> u32 {
        self.incorrect_count
    }

    /// Share of graded answers that were correct, in `0.0..=100.0`.
    ///
    /// Questions without a selected answer are not part of the denominator.
    #[must_use]
    pub fn accuracy_percent(&self) -> f64 {
        let graded = self.correct_count + self.incorrect_count;
        if graded == 0 {
            return 0.0;
        }
        f64::from(self.correct_count) * 100.0 / f64::from(graded)
    }

    #[must_use]
    pub fn per_question(&self) -> &[QuestionOutcome] {
        &self.per_question
    }
}
