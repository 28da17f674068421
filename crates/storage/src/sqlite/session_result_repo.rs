use exam_core::model::SessionSummary;

use super::SqliteRepository;
use super::mapping::{conn, id_i64, map_result_row, ser};
use crate::repository::{SessionResultRepository, SessionResultRow, StorageError};

#[async_trait::async_trait]
impl SessionResultRepository for SqliteRepository {
    async fn append_result(&self, summary: &SessionSummary) -> Result<i64, StorageError> {
        let per_question = serde_json::to_string(summary.per_question()).map_err(ser)?;

        let res = sqlx::query(
            r"
                INSERT INTO session_results (
                    session_id, mode, end_reason, started_at, ended_at,
                    time_taken_millis, questions_answered, correct_count,
                    incorrect_count, per_question
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
        )
        .bind(summary.session_id().to_string())
        .bind(summary.mode().as_str())
        .bind(summary.end_reason().as_str())
        .bind(summary.started_at())
        .bind(summary.ended_at())
        .bind(id_i64("time_taken_millis", summary.time_taken_millis())?)
        .bind(i64::from(summary.questions_answered()))
        .bind(i64::from(summary.correct_count()))
        .bind(i64::from(summary.incorrect_count()))
        .bind(per_question)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let duplicate = e
                .as_database_error()
                .is_some_and(|db| db.is_unique_violation());
            if duplicate {
                StorageError::Conflict
            } else {
                conn(e)
            }
        })?;

        Ok(res.last_insert_rowid())
    }

    async fn get_result(&self, id: i64) -> Result<SessionSummary, StorageError> {
        let row = sqlx::query(
            r"
                SELECT
                    id, session_id, mode, end_reason, started_at, ended_at,
                    time_taken_millis, questions_answered, correct_count,
                    incorrect_count, per_question
                FROM session_results
                WHERE id = ?1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        Ok(map_result_row(&row)?.summary)
    }

    async fn list_recent_results(
        &self,
        limit: u32,
    ) -> Result<Vec<SessionResultRow>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    id, session_id, mode, end_reason, started_at, ended_at,
                    time_taken_millis, questions_answered, correct_count,
                    incorrect_count, per_question
                FROM session_results
                ORDER BY ended_at DESC, id DESC
                LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            out.push(map_result_row(row)?);
        }
        Ok(out)
    }
}
