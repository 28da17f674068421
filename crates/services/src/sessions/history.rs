use chrono::{DateTime, Utc};
use std::sync::Arc;

use exam_core::model::{EndReason, SessionId, SessionMode, SessionSummary};
use storage::repository::{SessionResultRepository, SessionResultRow};

use crate::error::SessionError;

/// Storage identifier for a persisted session result (`SQLite` row id).
pub type SessionResultId = i64;

/// Presentation-agnostic list item for a stored result.
///
/// No pre-formatted strings; the UI decides how to render times and percentages.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionResultListItem {
    pub id: SessionResultId,
    pub session_id: SessionId,
    pub mode: SessionMode,
    pub end_reason: EndReason,
    pub ended_at: DateTime<Utc>,
    pub total_questions: usize,
    pub correct: u32,
    pub incorrect: u32,
    pub accuracy_percent: f64,
}

impl SessionResultListItem {
    #[must_use]
    pub fn from_row(row: &SessionResultRow) -> Self {
        let summary = &row.summary;
        Self {
            id: row.id,
            session_id: summary.session_id(),
            mode: summary.mode(),
            end_reason: summary.end_reason(),
            ended_at: summary.ended_at(),
            total_questions: summary.total_questions(),
            correct: summary.correct_count(),
            incorrect: summary.incorrect_count(),
            accuracy_percent: summary.accuracy_percent(),
        }
    }
}

/// Read side over stored session results.
#[derive(Clone)]
pub struct SessionHistoryService {
    results: Arc<dyn SessionResultRepository>,
}

impl SessionHistoryService {
    #[must_use]
    pub fn new(results: Arc<dyn SessionResultRepository>) -> Self {
        Self { results }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(storage::repository::InMemoryRepository::new()))
    }

    /// Most recent results first.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on repository failures.
    pub async fn list_recent(
        &self,
        limit: u32,
    ) -> Result<Vec<SessionResultListItem>, SessionError> {
        let rows = self.results.list_recent_results(limit).await?;
        Ok(rows.iter().map(SessionResultListItem::from_row).collect())
    }

    /// # Errors
    ///
    /// Returns `SessionError::Storage` when the result is missing or unreadable.
    pub async fn get_result(&self, id: SessionResultId) -> Result<SessionSummary, SessionError> {
        Ok(self.results.get_result(id).await?)
    }
}
