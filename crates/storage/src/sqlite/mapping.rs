use exam_core::model::{
    AnswerKey, AnswerOption, EndReason, ExamId, Question, QuestionId, QuestionOutcome, SessionId,
    SessionMode, SessionSummary,
};
use sqlx::Row;

use crate::repository::{SessionResultRow, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::new(i64_to_u64("question_id", v)?))
}

pub(crate) fn map_question_row(row: &sqlx::sqlite::SqliteRow) -> Result<Question, StorageError> {
    let id = question_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
    let exam_id = ExamId::new(i64_to_u64(
        "exam_id",
        row.try_get::<i64, _>("exam_id").map_err(ser)?,
    )?);
    let prompt: String = row.try_get("prompt").map_err(ser)?;
    let options_json: String = row.try_get("options").map_err(ser)?;
    let options: Vec<AnswerOption> = serde_json::from_str(&options_json).map_err(ser)?;
    let correct_answer =
        AnswerKey::new(row.try_get::<String, _>("correct_answer").map_err(ser)?).map_err(ser)?;

    Question::from_persisted(id, exam_id, prompt, options, correct_answer).map_err(ser)
}

pub(crate) fn map_result_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<SessionResultRow, StorageError> {
    let id: i64 = row.try_get("id").map_err(ser)?;
    let session_id: SessionId = row
        .try_get::<String, _>("session_id")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let mode = SessionMode::parse(&row.try_get::<String, _>("mode").map_err(ser)?).map_err(ser)?;
    let raw_reason: String = row.try_get("end_reason").map_err(ser)?;
    let end_reason = EndReason::parse(&raw_reason)
        .ok_or_else(|| StorageError::Serialization(format!("invalid end_reason: {raw_reason}")))?;
    let started_at = row.try_get("started_at").map_err(ser)?;
    let ended_at = row.try_get("ended_at").map_err(ser)?;
    let time_taken_millis = i64_to_u64(
        "time_taken_millis",
        row.try_get::<i64, _>("time_taken_millis").map_err(ser)?,
    )?;
    let questions_answered = u32_from_i64(
        "questions_answered",
        row.try_get::<i64, _>("questions_answered").map_err(ser)?,
    )?;
    let correct_count = u32_from_i64(
        "correct_count",
        row.try_get::<i64, _>("correct_count").map_err(ser)?,
    )?;
    let incorrect_count = u32_from_i64(
        "incorrect_count",
        row.try_get::<i64, _>("incorrect_count").map_err(ser)?,
    )?;
    let per_question_json: String = row.try_get("per_question").map_err(ser)?;
    let per_question: Vec<QuestionOutcome> =
        serde_json::from_str(&per_question_json).map_err(ser)?;

    let summary = SessionSummary::from_persisted(
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
    )
    .map_err(ser)?;

    Ok(SessionResultRow::new(id, summary))
}
