use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use exam_core::model::{
    AnswerKey, EndReason, Question, QuestionState, SessionConfig, SessionId, SessionMode,
    SessionSummary,
};
use exam_core::time::millis_between;

use super::events::SessionEvent;
use super::navigation::NavigationController;
use super::snapshot::{SessionProgress, SessionSnapshot};
use crate::error::{SessionError, SessionStoreError};

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

/// Session lifecycle. `Ended` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Active,
    Paused,
    Ended(EndReason),
}

/// Everything a running session knows. Mutated only through [`SessionStateStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    session_id: SessionId,
    mode: SessionMode,
    duration_millis: Option<u64>,
    questions: Vec<Question>,
    question_states: Vec<QuestionState>,
    current_index: usize,
    visited_indices: BTreeSet<usize>,
    remaining_time_millis: Option<u64>,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    phase: SessionPhase,
}

impl SessionState {
    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    #[must_use]
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    #[must_use]
    pub fn duration_millis(&self) -> Option<u64> {
        self.duration_millis
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question_states(&self) -> &[QuestionState] {
        &self.question_states
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[must_use]
    pub fn current_question(&self) -> &Question {
        &self.questions[self.current_index]
    }

    #[must_use]
    pub fn visited_indices(&self) -> &BTreeSet<usize> {
        &self.visited_indices
    }

    /// `None` for untimed sessions.
    #[must_use]
    pub fn remaining_time_millis(&self) -> Option<u64> {
        self.remaining_time_millis
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn is_ended(&self) -> bool {
        matches!(self.phase, SessionPhase::Ended(_))
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.phase == SessionPhase::Paused
    }
}

//
// ─── STORE ─────────────────────────────────────────────────────────────────────
//

/// Single source of truth for session progress.
///
/// Every operation either applies completely or returns an error and leaves
/// the state untouched. Pausing only freezes the countdown; answers and
/// navigation stay available while paused.
pub struct SessionStateStore {
    state: SessionState,
    events: Vec<SessionEvent>,
    summary: Option<SessionSummary>,
}

impl SessionStateStore {
    /// Create a store positioned on the first question.
    ///
    /// `questions` must be in the order of `config.question_ids()`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if no questions are given and
    /// `SessionError::MissingQuestions` if they do not match the configuration.
    pub fn new(
        session_id: SessionId,
        config: &SessionConfig,
        questions: Vec<Question>,
        started_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::Empty);
        }
        let matches_config = questions.len() == config.question_ids().len()
            && questions
                .iter()
                .zip(config.question_ids())
                .all(|(q, id)| q.id() == *id);
        if !matches_config {
            return Err(SessionError::MissingQuestions {
                expected: config.question_ids().len(),
                found: questions.len(),
            });
        }

        let mut question_states = vec![QuestionState::new(); questions.len()];
        question_states[0].visit();

        Ok(Self {
            state: SessionState {
                session_id,
                mode: config.mode(),
                duration_millis: config.duration_millis(),
                questions,
                question_states,
                current_index: 0,
                visited_indices: BTreeSet::from([0]),
                remaining_time_millis: config.duration_millis(),
                started_at,
                ended_at: None,
                phase: SessionPhase::Active,
            },
            events: Vec::new(),
            summary: None,
        })
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn navigation(&self) -> NavigationController<'_> {
        NavigationController::new(&self.state)
    }

    /// Graded summary, available once the session has ended.
    #[must_use]
    pub fn summary(&self) -> Option<&SessionSummary> {
        self.summary.as_ref()
    }

    /// Take all events emitted since the last drain, in dispatch order.
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = &self.state;
        SessionSnapshot {
            session_id: state.session_id,
            mode: state.mode,
            phase: state.phase,
            current_index: state.current_index,
            total_questions: state.questions.len(),
            remaining_time_millis: state.remaining_time_millis,
            current_question: state.current_question().clone(),
            question_states: state.question_states.clone(),
            tiles: self.navigation().tiles(),
            progress: SessionProgress::from_states(&state.question_states, state.is_ended()),
        }
    }

    fn ensure_open(&self) -> Result<(), SessionStoreError> {
        if self.state.is_ended() {
            return Err(SessionStoreError::SessionEnded);
        }
        Ok(())
    }

    fn check_index(&self, index: usize) -> Result<(), SessionStoreError> {
        let len = self.state.questions.len();
        if index >= len {
            return Err(SessionStoreError::IndexOutOfRange { index, len });
        }
        Ok(())
    }

    fn ensure_unlocked(&self, index: usize) -> Result<(), SessionStoreError> {
        if self.state.question_states[index].is_submitted() {
            return Err(SessionStoreError::LockedQuestion { index });
        }
        Ok(())
    }

    /// # Errors
    ///
    /// `SessionEnded`, `IndexOutOfRange`, `LockedQuestion`, or `UnknownOption`
    /// when `key` is not one of the question's options.
    pub fn select_answer(&mut self, index: usize, key: AnswerKey) -> Result<(), SessionStoreError> {
        self.ensure_open()?;
        self.check_index(index)?;
        self.ensure_unlocked(index)?;
        if !self.state.questions[index].has_option(&key) {
            return Err(SessionStoreError::UnknownOption { index, key });
        }
        self.state.question_states[index]
            .select_answer(key)
            .map_err(|_| SessionStoreError::LockedQuestion { index })
    }

    /// Flip the review flag, returning its new value.
    ///
    /// # Errors
    ///
    /// `SessionEnded`, `IndexOutOfRange`, or `LockedQuestion`.
    pub fn toggle_mark_for_review(&mut self, index: usize) -> Result<bool, SessionStoreError> {
        self.ensure_open()?;
        self.check_index(index)?;
        self.state.question_states[index]
            .toggle_mark_for_review()
            .map_err(|_| SessionStoreError::LockedQuestion { index })
    }

    /// Move to `index` and record the visit.
    ///
    /// # Errors
    ///
    /// `SessionEnded`, `IndexOutOfRange`, or `NavigationBlocked` for submitted questions.
    pub fn go_to_index(&mut self, index: usize) -> Result<(), SessionStoreError> {
        self.ensure_open()?;
        self.check_index(index)?;
        if !self.navigation().is_navigable(index) {
            return Err(SessionStoreError::NavigationBlocked { index });
        }
        self.state.current_index = index;
        self.state.visited_indices.insert(index);
        self.state.question_states[index].visit();
        Ok(())
    }

    /// Lock the current question. Returns `false` if it was already submitted.
    ///
    /// # Errors
    ///
    /// `SessionEnded`, or `SubmissionUnavailable` outside test mode.
    pub fn submit_current(&mut self) -> Result<bool, SessionStoreError> {
        self.ensure_open()?;
        if self.state.mode != SessionMode::Test {
            return Err(SessionStoreError::SubmissionUnavailable);
        }
        let index = self.state.current_index;
        let submitted = self.state.question_states[index].submit();
        if submitted {
            self.events.push(SessionEvent::QuestionSubmitted { index });
        }
        Ok(submitted)
    }

    /// Store the latest remaining time reported by the countdown.
    ///
    /// # Errors
    ///
    /// `SessionEnded` once the session is over.
    pub fn record_remaining_time(&mut self, remaining_millis: u64) -> Result<(), SessionStoreError> {
        self.ensure_open()?;
        if self.state.remaining_time_millis != Some(remaining_millis) {
            self.state.remaining_time_millis = Some(remaining_millis);
            self.events
                .push(SessionEvent::RemainingTimeChanged { remaining_millis });
        }
        Ok(())
    }

    /// Returns `false` if the session was already paused.
    ///
    /// # Errors
    ///
    /// `SessionEnded` once the session is over.
    pub fn pause_session(&mut self) -> Result<bool, SessionStoreError> {
        self.ensure_open()?;
        if self.state.phase == SessionPhase::Paused {
            return Ok(false);
        }
        self.state.phase = SessionPhase::Paused;
        self.events.push(SessionEvent::Paused);
        Ok(true)
    }

    /// Returns `false` if the session was not paused.
    ///
    /// # Errors
    ///
    /// `SessionEnded` once the session is over.
    pub fn resume_session(&mut self) -> Result<bool, SessionStoreError> {
        self.ensure_open()?;
        if self.state.phase != SessionPhase::Paused {
            return Ok(false);
        }
        self.state.phase = SessionPhase::Active;
        self.events.push(SessionEvent::Resumed);
        Ok(true)
    }

    /// The countdown ran out. Question states are left as they are.
    ///
    /// # Errors
    ///
    /// `SessionEnded` if the session already reached its terminal state.
    pub fn apply_timer_expiry(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<&SessionSummary, SessionStoreError> {
        self.end(EndReason::TimeExpired, now)
    }

    /// # Errors
    ///
    /// `SessionEnded` if the session already reached its terminal state.
    pub fn exit_session(&mut self, now: DateTime<Utc>) -> Result<&SessionSummary, SessionStoreError> {
        self.end(EndReason::UserExit, now)
    }

    /// Submit the session as a whole.
    ///
    /// # Errors
    ///
    /// `SessionEnded` if the session already reached its terminal state.
    pub fn finish_session(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<&SessionSummary, SessionStoreError> {
        self.end(EndReason::Submitted, now)
    }

    fn time_taken_millis(&self, remaining: Option<u64>, ended_at: DateTime<Utc>) -> u64 {
        match (self.state.duration_millis, remaining) {
            (Some(duration), Some(remaining)) => duration.saturating_sub(remaining),
            _ => millis_between(self.state.started_at, ended_at),
        }
    }

    fn end(
        &mut self,
        reason: EndReason,
        now: DateTime<Utc>,
    ) -> Result<&SessionSummary, SessionStoreError> {
        self.ensure_open()?;
        let ended_at = now.max(self.state.started_at);
        let remaining = match (reason, self.state.duration_millis) {
            (EndReason::TimeExpired, Some(_)) => Some(0),
            _ => self.state.remaining_time_millis,
        };
        let summary = SessionSummary::grade(
            self.state.session_id,
            self.state.mode,
            reason,
            self.state.started_at,
            ended_at,
            self.time_taken_millis(remaining, ended_at),
            &self.state.questions,
            &self.state.question_states,
        )?;

        self.state.phase = SessionPhase::Ended(reason);
        self.state.remaining_time_millis = remaining;
        self.state.ended_at = Some(ended_at);
        self.events.push(SessionEvent::SessionEnded {
            reason,
            summary: summary.clone(),
        });
        Ok(self.summary.insert(summary))
    }
}

impl fmt::Debug for SessionStateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStateStore")
            .field("session_id", &self.state.session_id)
            .field("mode", &self.state.mode)
            .field("questions_len", &self.state.questions.len())
            .field("current_index", &self.state.current_index)
            .field("phase", &self.state.phase)
            .field("pending_events", &self.events.len())
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Duration;
    use exam_core::model::{
        ExamId, QuestionDraft, QuestionId, QuestionStatus, SessionConfigDraft,
    };
    use exam_core::time::fixed_now;

    pub(crate) fn key(raw: &str) -> AnswerKey {
        AnswerKey::new(raw).unwrap()
    }

    pub(crate) fn build_question(id: u64) -> Question {
        QuestionDraft {
            exam_id: ExamId::new(1),
            prompt: format!("Question {id}"),
            options: vec![
                ("A".into(), "first".into()),
                ("B".into(), "second".into()),
                ("C".into(), "third".into()),
            ],
            correct_answer: "B".into(),
        }
        .validate(QuestionId::new(id))
        .unwrap()
    }

    fn build_with(config: SessionConfigDraft) -> SessionStateStore {
        let config = config.validate().unwrap();
        let questions = config
            .question_ids()
            .iter()
            .map(|id| build_question(id.value()))
            .collect();
        SessionStateStore::new(SessionId::generate(), &config, questions, fixed_now()).unwrap()
    }

    pub(crate) fn build_store(n: u64) -> SessionStateStore {
        build_with(SessionConfigDraft::test(
            60_000,
            (1..=n).map(QuestionId::new).collect(),
        ))
    }

    #[test]
    fn new_store_starts_on_first_question() {
        let store = build_store(3);
        let state = store.state();
        assert_eq!(state.current_index(), 0);
        assert_eq!(state.visited_indices(), &BTreeSet::from([0]));
        assert_eq!(state.question_states()[0].status(), QuestionStatus::Visited);
        assert_eq!(state.question_states()[1].status(), QuestionStatus::Unvisited);
        assert_eq!(state.remaining_time_millis(), Some(60_000));
        assert_eq!(state.phase(), SessionPhase::Active);
    }

    #[test]
    fn empty_or_mismatched_questions_are_rejected() {
        let config = SessionConfigDraft::test(1_000, vec![QuestionId::new(1), QuestionId::new(2)])
            .validate()
            .unwrap();
        let err = SessionStateStore::new(SessionId::generate(), &config, Vec::new(), fixed_now())
            .unwrap_err();
        assert!(matches!(err, SessionError::Empty));

        let err = SessionStateStore::new(
            SessionId::generate(),
            &config,
            vec![build_question(2), build_question(1)],
            fixed_now(),
        )
        .unwrap_err();
        assert!(matches!(err, SessionError::MissingQuestions { .. }));
    }

    #[test]
    fn answer_then_mark_then_submit() {
        let mut store = build_store(3);

        store.select_answer(0, key("B")).unwrap();
        assert_eq!(
            store.state().question_states()[0].status(),
            QuestionStatus::Answered
        );

        assert!(store.toggle_mark_for_review(0).unwrap());
        assert!(store.state().question_states()[0].is_marked_for_review());

        assert!(store.submit_current().unwrap());
        let qs = &store.state().question_states()[0];
        assert!(qs.is_submitted());
        assert_eq!(qs.status(), QuestionStatus::Submitted);

        let err = store.select_answer(0, key("C")).unwrap_err();
        assert_eq!(err, SessionStoreError::LockedQuestion { index: 0 });
        assert_eq!(
            store.state().question_states()[0].selected_answer(),
            Some(&key("B"))
        );
    }

    #[test]
    fn submitted_question_rejects_every_mutation() {
        let mut store = build_store(3);
        store.select_answer(0, key("A")).unwrap();
        store.submit_current().unwrap();
        store.go_to_index(2).unwrap();
        let before = store.state().clone();

        assert_eq!(
            store.select_answer(0, key("C")),
            Err(SessionStoreError::LockedQuestion { index: 0 })
        );
        assert_eq!(
            store.toggle_mark_for_review(0),
            Err(SessionStoreError::LockedQuestion { index: 0 })
        );
        assert_eq!(
            store.go_to_index(0),
            Err(SessionStoreError::NavigationBlocked { index: 0 })
        );
        assert_eq!(store.state(), &before);
    }

    #[test]
    fn submit_current_is_idempotent() {
        let mut store = build_store(2);
        assert!(store.submit_current().unwrap());
        assert!(!store.submit_current().unwrap());

        let submitted: Vec<_> = store
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, SessionEvent::QuestionSubmitted { .. }))
            .collect();
        assert_eq!(submitted, vec![SessionEvent::QuestionSubmitted { index: 0 }]);
    }

    #[test]
    fn navigate_away_and_back_keeps_state() {
        let mut store = build_store(3);
        store.go_to_index(0).unwrap();
        store.select_answer(0, key("A")).unwrap();
        store.go_to_index(1).unwrap();
        store.toggle_mark_for_review(1).unwrap();
        store.go_to_index(0).unwrap();

        let state = store.state();
        assert_eq!(state.visited_indices(), &BTreeSet::from([0, 1]));
        assert_eq!(state.current_index(), 0);
        assert_eq!(state.question_states()[0].selected_answer(), Some(&key("A")));
        assert!(state.question_states()[1].is_marked_for_review());
    }

    #[test]
    fn go_to_index_is_idempotent() {
        let mut once = build_store(3);
        once.go_to_index(2).unwrap();

        let mut twice = build_store(3);
        twice.go_to_index(2).unwrap();
        twice.go_to_index(2).unwrap();

        assert_eq!(once.state().current_index(), twice.state().current_index());
        assert_eq!(once.state().visited_indices(), twice.state().visited_indices());
    }

    #[test]
    fn out_of_range_and_unknown_options_are_rejected() {
        let mut store = build_store(2);
        assert_eq!(
            store.go_to_index(5),
            Err(SessionStoreError::IndexOutOfRange { index: 5, len: 2 })
        );
        assert_eq!(
            store.select_answer(1, key("Z")),
            Err(SessionStoreError::UnknownOption {
                index: 1,
                key: key("Z")
            })
        );
        assert_eq!(
            store.state().question_states()[1].status(),
            QuestionStatus::Unvisited
        );
    }

    #[test]
    fn study_mode_has_no_per_question_submission() {
        let mut store = build_with(SessionConfigDraft::study(vec![QuestionId::new(1)]));
        assert_eq!(
            store.submit_current(),
            Err(SessionStoreError::SubmissionUnavailable)
        );
        assert_eq!(store.state().remaining_time_millis(), None);
    }

    #[test]
    fn pause_keeps_input_available() {
        let mut store = build_store(2);
        assert!(store.pause_session().unwrap());
        assert!(!store.pause_session().unwrap());

        store.go_to_index(1).unwrap();
        store.select_answer(1, key("C")).unwrap();

        assert!(store.resume_session().unwrap());
        assert!(!store.resume_session().unwrap());
        assert_eq!(
            store.drain_events(),
            vec![SessionEvent::Paused, SessionEvent::Resumed]
        );
    }

    #[test]
    fn exit_is_terminal_and_idempotent() {
        let mut store = build_store(2);
        let now = fixed_now() + Duration::seconds(5);
        store.exit_session(now).unwrap();
        let ended = store.state().clone();
        let summary = store.summary().cloned();

        assert_eq!(
            store.exit_session(now + Duration::seconds(1)).unwrap_err(),
            SessionStoreError::SessionEnded
        );
        assert_eq!(
            store.apply_timer_expiry(now).unwrap_err(),
            SessionStoreError::SessionEnded
        );
        assert_eq!(store.go_to_index(1), Err(SessionStoreError::SessionEnded));
        assert_eq!(
            store.select_answer(0, key("A")),
            Err(SessionStoreError::SessionEnded)
        );
        assert_eq!(store.pause_session(), Err(SessionStoreError::SessionEnded));
        assert_eq!(
            store.record_remaining_time(1),
            Err(SessionStoreError::SessionEnded)
        );

        assert_eq!(store.state(), &ended);
        assert_eq!(store.summary().cloned(), summary);
        assert_eq!(
            store.state().phase(),
            SessionPhase::Ended(EndReason::UserExit)
        );
        let ended_events = store
            .drain_events()
            .into_iter()
            .filter(SessionEvent::is_terminal)
            .count();
        assert_eq!(ended_events, 1);
    }

    #[test]
    fn timer_expiry_grades_and_emits_session_ended() {
        let mut store = build_store(3);
        store.select_answer(0, key("B")).unwrap();
        store.go_to_index(1).unwrap();
        store.select_answer(1, key("A")).unwrap();

        let summary = store
            .apply_timer_expiry(fixed_now() + Duration::seconds(60))
            .unwrap()
            .clone();

        assert_eq!(summary.end_reason(), EndReason::TimeExpired);
        assert_eq!(summary.questions_answered(), 2);
        assert_eq!(summary.correct_count(), 1);
        assert_eq!(summary.incorrect_count(), 1);
        assert_eq!(summary.time_taken_millis(), 60_000);
        assert_eq!(store.state().remaining_time_millis(), Some(0));

        let events = store.drain_events();
        assert_eq!(
            events.last(),
            Some(&SessionEvent::SessionEnded {
                reason: EndReason::TimeExpired,
                summary
            })
        );
    }

    #[test]
    fn finish_uses_reported_remaining_time() {
        let mut store = build_store(1);
        store.record_remaining_time(45_000).unwrap();
        store.record_remaining_time(45_000).unwrap();
        let summary = store
            .finish_session(fixed_now() + Duration::seconds(15))
            .unwrap();
        assert_eq!(summary.end_reason(), EndReason::Submitted);
        assert_eq!(summary.time_taken_millis(), 15_000);

        let changes = store
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, SessionEvent::RemainingTimeChanged { .. }))
            .count();
        assert_eq!(changes, 1);
    }

    #[test]
    fn snapshot_reflects_progress() {
        let mut store = build_store(3);
        store.select_answer(0, key("A")).unwrap();
        store.toggle_mark_for_review(0).unwrap();
        store.submit_current().unwrap();
        store.go_to_index(1).unwrap();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.current_index, 1);
        assert_eq!(snapshot.total_questions, 3);
        assert_eq!(snapshot.current_question.id(), QuestionId::new(2));
        assert_eq!(snapshot.progress.answered, 1);
        assert_eq!(snapshot.progress.submitted, 1);
        assert_eq!(snapshot.progress.marked_for_review, 1);
        assert_eq!(snapshot.progress.unvisited, 1);
        assert!(!snapshot.progress.is_complete);
        assert_eq!(snapshot.tiles.len(), 3);
    }
}
