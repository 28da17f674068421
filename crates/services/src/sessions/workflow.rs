use std::sync::Arc;

use exam_core::model::{
    ExamId, SessionConfig, SessionConfigDraft, SessionId, SessionMode, SessionSummary,
};
use rand::rng;
use rand::seq::SliceRandom;
use storage::repository::{QuestionRepository, SessionResultRepository};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::events::SessionEvent;
use super::exam_session::ExamSession;
use crate::Clock;
use crate::error::{SessionError, SessionStoreError};
use crate::results_client::ResultSubmitter;

/// Outcome of [`SessionLoopService::finalize`].
#[derive(Debug)]
pub struct FinalizedSession {
    pub result_id: i64,
    pub summary: SessionSummary,
    /// Background submission to the backend, if one was started by this call.
    pub submission: Option<JoinHandle<()>>,
}

/// Orchestrates session start, clock-driven ticking and end-of-session hand-off.
#[derive(Clone)]
pub struct SessionLoopService {
    clock: Clock,
    questions: Arc<dyn QuestionRepository>,
    results: Arc<dyn SessionResultRepository>,
    submitter: Option<Arc<dyn ResultSubmitter>>,
    shuffle: bool,
}

impl SessionLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        questions: Arc<dyn QuestionRepository>,
        results: Arc<dyn SessionResultRepository>,
    ) -> Self {
        Self {
            clock,
            questions,
            results,
            submitter: None,
            shuffle: false,
        }
    }

    #[must_use]
    pub fn with_submitter(mut self, submitter: Arc<dyn ResultSubmitter>) -> Self {
        self.submitter = Some(submitter);
        self
    }

    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Start a session over the configured questions.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if a question cannot be loaded.
    pub async fn start_session(&self, config: SessionConfig) -> Result<ExamSession, SessionError> {
        let config = if self.shuffle {
            let mut order = config.question_ids().to_vec();
            order.shuffle(&mut rng());
            config.with_question_order(order)
        } else {
            config
        };

        let questions = self.questions.get_questions(config.question_ids()).await?;
        if questions.len() != config.question_ids().len() {
            return Err(SessionError::MissingQuestions {
                expected: config.question_ids().len(),
                found: questions.len(),
            });
        }

        let session_id = SessionId::generate();
        let session = ExamSession::start(session_id, &config, questions, self.clock.now())?;
        info!(
            session_id = %session_id,
            mode = %config.mode(),
            questions = config.question_ids().len(),
            duration_millis = ?config.duration_millis(),
            "session started"
        );
        Ok(session)
    }

    /// Start a session over the first `limit` questions of an exam.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if the exam has no questions and
    /// `SessionError::Config` for an invalid mode/duration combination.
    pub async fn start_exam_session(
        &self,
        exam_id: ExamId,
        mode: SessionMode,
        duration_millis: Option<u64>,
        limit: u32,
    ) -> Result<ExamSession, SessionError> {
        let question_ids = self.questions.list_question_ids(exam_id, limit).await?;
        if question_ids.is_empty() {
            return Err(SessionError::Empty);
        }
        let config = SessionConfigDraft {
            mode,
            duration_millis,
            question_ids,
        }
        .validate()?;
        self.start_session(config).await
    }

    /// Advance the session against the service clock.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Store` if grading fails on expiry.
    pub fn tick(&self, session: &mut ExamSession) -> Result<Vec<SessionEvent>, SessionError> {
        let events = session.tick(self.clock.now())?;
        for event in &events {
            if let SessionEvent::SessionEnded { reason, .. } = event {
                info!(session_id = %session.session_id(), %reason, "session ended");
            }
        }
        Ok(events)
    }

    /// # Errors
    ///
    /// Returns `SessionError::Store` if the session already ended.
    pub fn finish(&self, session: &mut ExamSession) -> Result<SessionSummary, SessionError> {
        let summary = session.finish(self.clock.now())?;
        info!(session_id = %session.session_id(), "session submitted");
        Ok(summary)
    }

    /// # Errors
    ///
    /// Returns `SessionError::Store` if the session already ended.
    pub fn exit(&self, session: &mut ExamSession) -> Result<SessionSummary, SessionError> {
        let summary = session.exit(self.clock.now())?;
        info!(session_id = %session.session_id(), "session exited");
        Ok(summary)
    }

    /// Leave the session, keeping the result it already ended with.
    ///
    /// Used when input goes away: a countdown that ran out first still wins.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Store` if grading fails.
    pub fn leave(&self, session: &mut ExamSession) -> Result<SessionSummary, SessionError> {
        match self.exit(session) {
            Err(SessionError::Store(SessionStoreError::SessionEnded)) => {
                session.summary().cloned().ok_or(SessionError::NotEnded)
            }
            other => other,
        }
    }

    /// Log a rejected user action. The session is unchanged.
    pub fn note_rejected(&self, session: &ExamSession, err: &SessionStoreError) {
        debug!(session_id = %session.session_id(), error = %err, "action rejected");
    }

    /// Persist the graded result and hand it to the submitter in the background.
    ///
    /// Repeated calls return the stored row id without persisting or submitting again.
    /// Submission failures are logged and never retried.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotEnded` before the session ends and
    /// `SessionError::Storage` if the result cannot be stored.
    pub async fn finalize(
        &self,
        session: &mut ExamSession,
    ) -> Result<FinalizedSession, SessionError> {
        let summary = session.summary().cloned().ok_or(SessionError::NotEnded)?;
        if let Some(result_id) = session.result_id() {
            return Ok(FinalizedSession {
                result_id,
                summary,
                submission: None,
            });
        }

        let result_id = self.results.append_result(&summary).await?;
        session.set_result_id(result_id);
        info!(
            session_id = %summary.session_id(),
            result_id,
            correct = summary.correct_count(),
            incorrect = summary.incorrect_count(),
            "session result stored"
        );

        let submission = self.submitter.clone().map(|submitter| {
            let summary = summary.clone();
            tokio::spawn(async move {
                match submitter.submit(&summary).await {
                    Ok(()) => info!(session_id = %summary.session_id(), "session result submitted"),
                    Err(err) => warn!(
                        session_id = %summary.session_id(),
                        error = %err,
                        "session result submission failed"
                    ),
                }
            })
        });

        Ok(FinalizedSession {
            result_id,
            summary,
            submission,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use exam_core::model::{EndReason, QuestionId};
    use exam_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    use crate::sessions::store::tests::build_question;

    async fn seeded_repo(n: u64) -> InMemoryRepository {
        let repo = InMemoryRepository::new();
        for id in 1..=n {
            repo.upsert_question(&build_question(id)).await.unwrap();
        }
        repo
    }

    fn service(repo: &InMemoryRepository, clock: Clock) -> SessionLoopService {
        SessionLoopService::new(clock, Arc::new(repo.clone()), Arc::new(repo.clone()))
    }

    #[tokio::test]
    async fn shuffle_keeps_the_same_questions() {
        let repo = seeded_repo(6).await;
        let svc = service(&repo, Clock::fixed(fixed_now())).with_shuffle(true);
        let ids: Vec<_> = (1..=6).map(QuestionId::new).collect();
        let config = SessionConfigDraft::test(60_000, ids.clone()).validate().unwrap();

        let session = svc.start_session(config).await.unwrap();
        let mut loaded: Vec<_> = session
            .store()
            .state()
            .questions()
            .iter()
            .map(|q| q.id())
            .collect();
        loaded.sort();
        assert_eq!(loaded, ids);
    }

    #[tokio::test]
    async fn unknown_questions_fail_to_start() {
        let repo = seeded_repo(1).await;
        let svc = service(&repo, Clock::fixed(fixed_now()));
        let config = SessionConfigDraft::study(vec![QuestionId::new(1), QuestionId::new(2)])
            .validate()
            .unwrap();

        let err = svc.start_session(config).await.unwrap_err();
        assert!(matches!(err, SessionError::Storage(_)));
    }

    #[tokio::test]
    async fn empty_exam_is_rejected() {
        let repo = InMemoryRepository::new();
        let svc = service(&repo, Clock::fixed(fixed_now()));
        let err = svc
            .start_exam_session(ExamId::new(1), SessionMode::Study, None, 10)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Empty));
    }

    #[tokio::test]
    async fn finalize_requires_an_ended_session_and_is_idempotent() {
        let repo = seeded_repo(2).await;
        let mut clock = Clock::fixed(fixed_now());
        let svc = service(&repo, clock);
        let mut session = svc
            .start_exam_session(ExamId::new(1), SessionMode::Test, Some(5_000), 10)
            .await
            .unwrap();

        assert!(matches!(
            svc.finalize(&mut session).await,
            Err(SessionError::NotEnded)
        ));

        clock.advance(Duration::seconds(5));
        let svc = service(&repo, clock);
        let events = svc.tick(&mut session).unwrap();
        assert!(events.iter().any(SessionEvent::is_terminal));

        let first = svc.finalize(&mut session).await.unwrap();
        assert!(first.submission.is_none());
        assert_eq!(first.summary.end_reason(), EndReason::TimeExpired);

        let second = svc.finalize(&mut session).await.unwrap();
        assert_eq!(second.result_id, first.result_id);
        assert_eq!(repo.list_recent_results(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn leaving_keeps_an_expired_result() {
        let repo = seeded_repo(2).await;
        let mut session = service(&repo, Clock::fixed(fixed_now()))
            .start_exam_session(ExamId::new(1), SessionMode::Test, Some(1_000), 10)
            .await
            .unwrap();

        // Input closes after the deadline, before any tick.
        let svc = service(&repo, Clock::fixed(fixed_now() + Duration::seconds(3)));
        let summary = svc.leave(&mut session).unwrap();
        assert_eq!(summary.end_reason(), EndReason::TimeExpired);
        assert_eq!(svc.leave(&mut session).unwrap(), summary);

        let finalized = svc.finalize(&mut session).await.unwrap();
        assert_eq!(finalized.summary.end_reason(), EndReason::TimeExpired);
        assert_eq!(repo.list_recent_results(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn leaving_a_running_session_exits_it() {
        let repo = seeded_repo(1).await;
        let svc = service(&repo, Clock::fixed(fixed_now()));
        let mut session = svc
            .start_exam_session(ExamId::new(1), SessionMode::Study, None, 10)
            .await
            .unwrap();

        let summary = svc.leave(&mut session).unwrap();
        assert_eq!(summary.end_reason(), EndReason::UserExit);
    }
}
