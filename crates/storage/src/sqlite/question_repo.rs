use std::collections::HashMap;

use chrono::Utc;
use exam_core::model::{ExamId, Question, QuestionId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, id_i64, map_question_row, question_id_from_i64, ser};
use crate::repository::{QuestionRepository, StorageError};

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        let options = serde_json::to_string(question.options()).map_err(ser)?;

        sqlx::query(
            r"
                INSERT INTO questions (id, exam_id, prompt, options, correct_answer, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(id) DO UPDATE SET
                    exam_id = excluded.exam_id,
                    prompt = excluded.prompt,
                    options = excluded.options,
                    correct_answer = excluded.correct_answer,
                    updated_at = excluded.updated_at
            ",
        )
        .bind(id_i64("question_id", question.id().value())?)
        .bind(id_i64("exam_id", question.exam_id().value())?)
        .bind(question.prompt())
        .bind(options)
        .bind(question.correct_answer().as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn get_questions(&self, ids: &[QuestionId]) -> Result<Vec<Question>, StorageError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut sql = String::from(
            r"
                SELECT id, exam_id, prompt, options, correct_answer
                FROM questions
                WHERE id IN (
            ",
        );
        for i in 0..ids.len() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push('?');
            sql.push_str(&(i + 1).to_string());
        }
        sql.push(')');

        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id_i64("question_id", id.value())?);
        }

        let rows = query.fetch_all(&self.pool).await.map_err(conn)?;
        let mut by_id = HashMap::with_capacity(rows.len());
        for row in &rows {
            let question = map_question_row(row)?;
            by_id.insert(question.id(), question);
        }

        ids.iter()
            .map(|id| by_id.get(id).cloned().ok_or(StorageError::NotFound))
            .collect()
    }

    async fn list_question_ids(
        &self,
        exam_id: ExamId,
        limit: u32,
    ) -> Result<Vec<QuestionId>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id
                FROM questions
                WHERE exam_id = ?1
                ORDER BY id ASC
                LIMIT ?2
            ",
        )
        .bind(id_i64("exam_id", exam_id.value())?)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter()
            .map(|row| question_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?))
            .collect()
    }
}
