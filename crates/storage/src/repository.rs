use async_trait::async_trait;
use exam_core::model::{ExamId, Question, QuestionId, SessionId, SessionSummary};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A persisted session result together with its storage row id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionResultRow {
    pub id: i64,
    pub summary: SessionSummary,
}

impl SessionResultRow {
    #[must_use]
    pub fn new(id: i64, summary: SessionSummary) -> Self {
        Self { id, summary }
    }
}

/// Question bank contract. Sessions only read from it.
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Persist or update a question.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError>;

    /// Fetch questions by id, preserving the order of `ids`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if any id is missing.
    async fn get_questions(&self, ids: &[QuestionId]) -> Result<Vec<Question>, StorageError>;

    /// List up to `limit` question ids of an exam in ascending id order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_question_ids(
        &self,
        exam_id: ExamId,
        limit: u32,
    ) -> Result<Vec<QuestionId>, StorageError>;
}

/// Store for graded session results.
#[async_trait]
pub trait SessionResultRepository: Send + Sync {
    /// Append a result and return its row id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if a result for the same session already exists.
    async fn append_result(&self, summary: &SessionSummary) -> Result<i64, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no row has this id.
    async fn get_result(&self, id: i64) -> Result<SessionSummary, StorageError>;

    /// Most recently ended results first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_recent_results(&self, limit: u32)
    -> Result<Vec<SessionResultRow>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    questions: Arc<Mutex<BTreeMap<QuestionId, Question>>>,
    results: Arc<Mutex<Vec<SessionResultRow>>>,
    sessions: Arc<Mutex<HashMap<SessionId, i64>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        let mut guard = self.questions.lock().map_err(poisoned)?;
        guard.insert(question.id(), question.clone());
        Ok(())
    }

    async fn get_questions(&self, ids: &[QuestionId]) -> Result<Vec<Question>, StorageError> {
        let guard = self.questions.lock().map_err(poisoned)?;
        ids.iter()
            .map(|id| guard.get(id).cloned().ok_or(StorageError::NotFound))
            .collect()
    }

    async fn list_question_ids(
        &self,
        exam_id: ExamId,
        limit: u32,
    ) -> Result<Vec<QuestionId>, StorageError> {
        let guard = self.questions.lock().map_err(poisoned)?;
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(guard
            .values()
            .filter(|q| q.exam_id() == exam_id)
            .map(Question::id)
            .take(limit)
            .collect())
    }
}

#[async_trait]
impl SessionResultRepository for InMemoryRepository {
    async fn append_result(&self, summary: &SessionSummary) -> Result<i64, StorageError> {
        let mut sessions = self.sessions.lock().map_err(poisoned)?;
        if sessions.contains_key(&summary.session_id()) {
            return Err(StorageError::Conflict);
        }
        let mut results = self.results.lock().map_err(poisoned)?;
        let id = i64::try_from(results.len() + 1)
            .map_err(|_| StorageError::Serialization("result id overflow".into()))?;
        results.push(SessionResultRow::new(id, summary.clone()));
        sessions.insert(summary.session_id(), id);
        Ok(id)
    }

    async fn get_result(&self, id: i64) -> Result<SessionSummary, StorageError> {
        let guard = self.results.lock().map_err(poisoned)?;
        guard
            .iter()
            .find(|row| row.id == id)
            .map(|row| row.summary.clone())
            .ok_or(StorageError::NotFound)
    }

    async fn list_recent_results(
        &self,
        limit: u32,
    ) -> Result<Vec<SessionResultRow>, StorageError> {
        let guard = self.results.lock().map_err(poisoned)?;
        let mut rows = guard.clone();
        rows.sort_by(|a, b| {
            b.summary
                .ended_at()
                .cmp(&a.summary.ended_at())
                .then_with(|| b.id.cmp(&a.id))
        });
        rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(rows)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub questions: Arc<dyn QuestionRepository>,
    pub results: Arc<dyn SessionResultRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let questions: Arc<dyn QuestionRepository> = Arc::new(repo.clone());
        let results: Arc<dyn SessionResultRepository> = Arc::new(repo);
        Self { questions, results }
    }
}
