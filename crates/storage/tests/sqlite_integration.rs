use chrono::Duration;
use exam_core::model::{
    AnswerKey, EndReason, ExamId, Question, QuestionDraft, QuestionId, QuestionState, SessionId,
    SessionMode, SessionSummary,
};
use exam_core::time::fixed_now;
use storage::repository::{QuestionRepository, SessionResultRepository, StorageError};
use storage::sqlite::SqliteRepository;

fn build_question(id: u64, exam: u64, correct: &str) -> Question {
    QuestionDraft {
        exam_id: ExamId::new(exam),
        prompt: format!("Question {id}"),
        options: vec![
            ("A".into(), "alpha".into()),
            ("B".into(), "beta".into()),
            ("C".into(), "gamma".into()),
        ],
        correct_answer: correct.into(),
    }
    .validate(QuestionId::new(id))
    .unwrap()
}

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn questions_round_trip_in_requested_order() {
    let repo = connect("memdb_questions").await;
    for id in 1..=3 {
        repo.upsert_question(&build_question(id, 7, "B")).await.unwrap();
    }
    repo.upsert_question(&build_question(10, 8, "A")).await.unwrap();

    let ids = [QuestionId::new(3), QuestionId::new(1), QuestionId::new(2)];
    let fetched = repo.get_questions(&ids).await.unwrap();
    assert_eq!(fetched.iter().map(Question::id).collect::<Vec<_>>(), ids.to_vec());
    assert_eq!(fetched[0].options().len(), 3);
    assert_eq!(fetched[0].correct_answer().as_str(), "B");

    let listed = repo.list_question_ids(ExamId::new(7), 2).await.unwrap();
    assert_eq!(listed, vec![QuestionId::new(1), QuestionId::new(2)]);

    let missing = repo
        .get_questions(&[QuestionId::new(1), QuestionId::new(99)])
        .await;
    assert!(matches!(missing, Err(StorageError::NotFound)));
}

#[tokio::test]
async fn upsert_replaces_question_content() {
    let repo = connect("memdb_upsert").await;
    repo.upsert_question(&build_question(1, 1, "A")).await.unwrap();
    repo.upsert_question(&build_question(1, 1, "C")).await.unwrap();

    let fetched = repo.get_questions(&[QuestionId::new(1)]).await.unwrap();
    assert_eq!(fetched[0].correct_answer().as_str(), "C");
}

#[tokio::test]
async fn session_results_persist_with_outcomes() {
    let repo = connect("memdb_results").await;
    let questions = vec![build_question(1, 1, "A"), build_question(2, 1, "B")];
    let mut answered = QuestionState::new();
    answered.select_answer(AnswerKey::new("A").unwrap()).unwrap();
    answered.submit();
    let states = vec![answered, QuestionState::new()];

    let started = fixed_now();
    let summary = SessionSummary::grade(
        SessionId::generate(),
        SessionMode::Test,
        EndReason::TimeExpired,
        started,
        started + Duration::minutes(10),
        600_000,
        &questions,
        &states,
    )
    .unwrap();

    let id = repo.append_result(&summary).await.unwrap();
    let loaded = repo.get_result(id).await.unwrap();
    assert_eq!(loaded, summary);
    assert_eq!(loaded.correct_count(), 1);
    assert_eq!(loaded.end_reason(), EndReason::TimeExpired);

    let duplicate = repo.append_result(&summary).await;
    assert!(matches!(duplicate, Err(StorageError::Conflict)));

    let recent = repo.list_recent_results(5).await.unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].id, id);

    assert!(matches!(
        repo.get_result(id + 100).await,
        Err(StorageError::NotFound)
    ));
}
