use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Duration;
use exam_core::model::{
    AnswerKey, Correctness, EndReason, ExamId, QuestionDraft, QuestionId, QuestionStatus,
    SessionMode, SessionSummary,
};
use exam_core::time::fixed_now;
use services::{
    Clock, ResultSubmitter, ResultsClientError, SessionEvent, SessionHistoryService,
    SessionLoopService, SessionStoreError, TileCategory,
};
use storage::repository::{InMemoryRepository, QuestionRepository, SessionResultRepository};

#[derive(Default)]
struct RecordingSubmitter {
    received: Mutex<Vec<SessionSummary>>,
    fail: bool,
}

#[async_trait]
impl ResultSubmitter for RecordingSubmitter {
    async fn submit(&self, summary: &SessionSummary) -> Result<(), ResultsClientError> {
        self.received.lock().unwrap().push(summary.clone());
        if self.fail {
            return Err(ResultsClientError::Disabled);
        }
        Ok(())
    }
}

async fn seed(repo: &InMemoryRepository, count: u64) {
    for id in 1..=count {
        let question = QuestionDraft {
            exam_id: ExamId::new(1),
            prompt: format!("Q{id}"),
            options: vec![
                ("A".into(), "one".into()),
                ("B".into(), "two".into()),
                ("C".into(), "three".into()),
                ("D".into(), "four".into()),
            ],
            correct_answer: "A".into(),
        }
        .validate(QuestionId::new(id))
        .unwrap();
        repo.upsert_question(&question).await.unwrap();
    }
}

fn key(raw: &str) -> AnswerKey {
    AnswerKey::new(raw).unwrap()
}

#[tokio::test]
async fn answered_then_expired_session_is_stored_and_submitted() {
    let repo = InMemoryRepository::new();
    seed(&repo, 3).await;
    let submitter = Arc::new(RecordingSubmitter::default());
    let mut clock = Clock::fixed(fixed_now());

    let svc = SessionLoopService::new(clock, Arc::new(repo.clone()), Arc::new(repo.clone()))
        .with_submitter(submitter.clone());
    let mut session = svc
        .start_exam_session(ExamId::new(1), SessionMode::Test, Some(60_000), 10)
        .await
        .unwrap();

    // Answer, mark, submit the first question.
    let now = clock.now();
    session.select_answer(0, key("A"), now).unwrap();
    assert!(session.toggle_mark_for_review(0, now).unwrap());
    assert!(session.submit_current(now).unwrap());
    assert_eq!(
        session.select_answer(0, key("B"), now),
        Err(SessionStoreError::LockedQuestion { index: 0 })
    );

    // Navigate away, then try to come back.
    session.go_to_index(1, now).unwrap();
    session.select_answer(1, key("C"), now).unwrap();
    assert_eq!(
        session.go_to_index(0, now),
        Err(SessionStoreError::NavigationBlocked { index: 0 })
    );
    let snapshot = session.snapshot();
    assert_eq!(snapshot.tiles[0].category, TileCategory::SubmittedLocked);
    assert_eq!(snapshot.tiles[1].category, TileCategory::Current);
    assert_eq!(snapshot.tiles[2].category, TileCategory::Unvisited);

    // Let the clock run past the deadline in one jump.
    clock.advance(Duration::seconds(90));
    let svc = SessionLoopService::new(clock, Arc::new(repo.clone()), Arc::new(repo.clone()))
        .with_submitter(submitter.clone());
    let events = svc.tick(&mut session).unwrap();
    assert!(matches!(
        events.last(),
        Some(SessionEvent::SessionEnded {
            reason: EndReason::TimeExpired,
            ..
        })
    ));

    let finalized = svc.finalize(&mut session).await.unwrap();
    finalized.submission.expect("submission spawned").await.unwrap();

    let summary = &finalized.summary;
    assert_eq!(summary.questions_answered(), 2);
    assert_eq!(summary.correct_count(), 1);
    assert_eq!(summary.incorrect_count(), 1);
    assert_eq!(summary.time_taken_millis(), 60_000);
    assert_eq!(summary.per_question()[0].status, QuestionStatus::Submitted);
    assert!(summary.per_question()[0].is_marked_for_review);
    assert_eq!(summary.per_question()[2].correctness, Correctness::Unanswered);

    let stored = repo.get_result(finalized.result_id).await.unwrap();
    assert_eq!(&stored, summary);
    assert_eq!(submitter.received.lock().unwrap().as_slice(), &[summary.clone()]);

    let history = SessionHistoryService::new(Arc::new(repo.clone()));
    let items = history.list_recent(5).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, finalized.result_id);
}

#[tokio::test]
async fn failed_submission_keeps_the_stored_result() {
    let repo = InMemoryRepository::new();
    seed(&repo, 2).await;
    let submitter = Arc::new(RecordingSubmitter {
        fail: true,
        ..RecordingSubmitter::default()
    });

    let svc = SessionLoopService::new(
        Clock::fixed(fixed_now()),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
    )
    .with_submitter(submitter.clone());
    let mut session = svc
        .start_exam_session(ExamId::new(1), SessionMode::Study, None, 10)
        .await
        .unwrap();

    session.select_answer(0, key("A"), fixed_now()).unwrap();
    let summary = svc.exit(&mut session).unwrap();
    assert_eq!(summary.end_reason(), EndReason::UserExit);
    assert!(matches!(
        svc.exit(&mut session),
        Err(services::SessionError::Store(SessionStoreError::SessionEnded))
    ));

    let finalized = svc.finalize(&mut session).await.unwrap();
    finalized.submission.expect("submission spawned").await.unwrap();

    assert_eq!(submitter.received.lock().unwrap().len(), 1);
    assert_eq!(repo.list_recent_results(5).await.unwrap().len(), 1);
    assert!((finalized.summary.accuracy_percent() - 100.0).abs() < f64::EPSILON);
}
