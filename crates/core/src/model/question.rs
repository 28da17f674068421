use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{ExamId, QuestionId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question prompt cannot be empty")]
    EmptyPrompt,

    #[error("answer key cannot be empty")]
    EmptyAnswerKey,

    #[error("question needs at least two options, got {0}")]
    TooFewOptions(usize),

    #[error("option text for key {0} cannot be empty")]
    EmptyOptionText(AnswerKey),

    #[error("duplicate option key: {0}")]
    DuplicateOptionKey(AnswerKey),

    #[error("correct answer {0} is not one of the options")]
    CorrectAnswerNotAnOption(AnswerKey),
}

//
// ─── ANSWER KEY ────────────────────────────────────────────────────────────────
//

/// Label of a single option ("A", "B", ...). Compared case-sensitively after trimming.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AnswerKey(String);

impl AnswerKey {
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyAnswerKey` if the key is blank.
    pub fn new(raw: impl Into<String>) -> Result<Self, QuestionError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(QuestionError::EmptyAnswerKey);
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AnswerKey {
    type Error = QuestionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AnswerKey> for String {
    fn from(value: AnswerKey) -> Self {
        value.0
    }
}

impl fmt::Debug for AnswerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AnswerKey({})", self.0)
    }
}

impl fmt::Display for AnswerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub key: AnswerKey,
    pub text: String,
}

/// Unvalidated question as it arrives from an editor or seed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDraft {
    pub exam_id: ExamId,
    pub prompt: String,
    pub options: Vec<(String, String)>,
    pub correct_answer: String,
}

impl QuestionDraft {
    /// Validate the draft and bind it to an id.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` when the prompt is blank, there are fewer than two
    /// options, keys repeat, or the correct answer is not among the options.
    pub fn validate(self, id: QuestionId) -> Result<Question, QuestionError> {
        let options = self
            .options
            .into_iter()
            .map(|(key, text)| {
                Ok(AnswerOption {
                    key: AnswerKey::new(key)?,
                    text: text.trim().to_string(),
                })
            })
            .collect::<Result<Vec<_>, QuestionError>>()?;
        let correct_answer = AnswerKey::new(self.correct_answer)?;

        Question::from_persisted(id, self.exam_id, self.prompt, options, correct_answer)
    }
}

/// A multiple-choice question. Owned by the question bank; read-only to sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    exam_id: ExamId,
    prompt: String,
    options: Vec<AnswerOption>,
    correct_answer: AnswerKey,
}

impl Question {
    /// Rehydrate a question from storage, re-checking its invariants.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the stored shape is inconsistent.
    pub fn from_persisted(
        id: QuestionId,
        exam_id: ExamId,
        prompt: String,
        options: Vec<AnswerOption>,
        correct_answer: AnswerKey,
    ) -> Result<Self, QuestionError> {
        let prompt = prompt.trim().to_string();
        if prompt.is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }
        if options.len() < 2 {
            return Err(QuestionError::TooFewOptions(options.len()));
        }

        let mut seen = HashSet::with_capacity(options.len());
        for option in &options {
            if option.text.trim().is_empty() {
                return Err(QuestionError::EmptyOptionText(option.key.clone()));
            }
            if !seen.insert(option.key.clone()) {
                return Err(QuestionError::DuplicateOptionKey(option.key.clone()));
            }
        }
        if !seen.contains(&correct_answer) {
            return Err(QuestionError::CorrectAnswerNotAnOption(correct_answer));
        }

        Ok(Self {
            id,
            exam_id,
            prompt,
            options,
            correct_answer,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn exam_id(&self) -> ExamId {
        self.exam_id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[AnswerOption] {
        &self.options
    }

    #[must_use]
    pub fn correct_answer(&self) -> &AnswerKey {
        &self.correct_answer
    }

    /// True if `key` labels one of this question's options.
    #[must_use]
    pub fn has_option(&self, key: &AnswerKey) -> bool {
        self.options.iter().any(|option| &option.key == key)
    }

    #[must_use]
    pub fn is_correct(&self, key: &AnswerKey) -> bool {
        &self.correct_answer == key
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
