use chrono::{DateTime, Utc};
use exam_core::model::{AnswerKey, Question, SessionConfig, SessionId, SessionSummary};
use exam_core::{CountdownTimer, TimerEvent};

use super::events::SessionEvent;
use super::snapshot::SessionSnapshot;
use super::store::SessionStateStore;
use crate::error::{SessionError, SessionStoreError};

/// A running session: the state store wired to its countdown.
///
/// Timer events are forwarded into the store on every call that receives
/// `now`, so expiry is observed even if the caller's ticks arrive late.
/// Untimed sessions carry no timer.
#[derive(Debug)]
pub struct ExamSession {
    store: SessionStateStore,
    timer: Option<CountdownTimer>,
    result_id: Option<i64>,
}

impl ExamSession {
    /// # Errors
    ///
    /// Returns `SessionError` if the questions do not match `config`.
    pub fn start(
        session_id: SessionId,
        config: &SessionConfig,
        questions: Vec<Question>,
        now: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        let store = SessionStateStore::new(session_id, config, questions, now)?;
        let timer = config.duration_millis().map(|duration| {
            let mut timer = CountdownTimer::new();
            timer.start(duration, now);
            timer
        });
        Ok(Self {
            store,
            timer,
            result_id: None,
        })
    }

    #[must_use]
    pub fn store(&self) -> &SessionStateStore {
        &self.store
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.store.state().session_id()
    }

    #[must_use]
    pub fn is_ended(&self) -> bool {
        self.store.state().is_ended()
    }

    /// Row id of the persisted result, once finalized.
    #[must_use]
    pub fn result_id(&self) -> Option<i64> {
        self.result_id
    }

    pub(crate) fn set_result_id(&mut self, id: i64) {
        self.result_id = Some(id);
    }

    #[must_use]
    pub fn summary(&self) -> Option<&SessionSummary> {
        self.store.summary()
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.store.snapshot()
    }

    /// Live remaining time, `None` for untimed sessions.
    #[must_use]
    pub fn remaining_millis(&self, now: DateTime<Utc>) -> Option<u64> {
        self.timer.as_ref().map(|timer| timer.remaining_millis(now))
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        self.store.drain_events()
    }

    fn sync_timer(&mut self, now: DateTime<Utc>) -> Result<(), SessionStoreError> {
        let Some(timer) = self.timer.as_mut() else {
            return Ok(());
        };
        for event in timer.tick(now) {
            match event {
                TimerEvent::RemainingTimeChanged(remaining) => {
                    self.store.record_remaining_time(remaining)?;
                }
                TimerEvent::Expired => {
                    self.store.apply_timer_expiry(now)?;
                }
            }
        }
        Ok(())
    }

    /// Advance the countdown and return every event emitted since the last drain.
    ///
    /// # Errors
    ///
    /// Returns `SessionStoreError` if grading fails on expiry.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Result<Vec<SessionEvent>, SessionStoreError> {
        if !self.is_ended() {
            self.sync_timer(now)?;
        }
        Ok(self.store.drain_events())
    }

    /// Forward the countdown to `now`, then refuse to act on an ended session.
    fn observe(&mut self, now: DateTime<Utc>) -> Result<(), SessionStoreError> {
        self.sync_timer(now)?;
        if self.is_ended() {
            return Err(SessionStoreError::SessionEnded);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// `SessionEnded` once the countdown has run out at `now`; otherwise see
    /// [`SessionStateStore::select_answer`].
    pub fn select_answer(
        &mut self,
        index: usize,
        key: AnswerKey,
        now: DateTime<Utc>,
    ) -> Result<(), SessionStoreError> {
        self.observe(now)?;
        self.store.select_answer(index, key)
    }

    /// # Errors
    ///
    /// See [`SessionStateStore::toggle_mark_for_review`].
    pub fn toggle_mark_for_review(
        &mut self,
        index: usize,
        now: DateTime<Utc>,
    ) -> Result<bool, SessionStoreError> {
        self.observe(now)?;
        self.store.toggle_mark_for_review(index)
    }

    /// # Errors
    ///
    /// See [`SessionStateStore::go_to_index`].
    pub fn go_to_index(&mut self, index: usize, now: DateTime<Utc>) -> Result<(), SessionStoreError> {
        self.observe(now)?;
        self.store.go_to_index(index)
    }

    /// Move to the nearest enterable question after the current one.
    /// Returns `false` when there is none.
    ///
    /// # Errors
    ///
    /// See [`SessionStateStore::go_to_index`].
    pub fn go_next(&mut self, now: DateTime<Utc>) -> Result<bool, SessionStoreError> {
        self.observe(now)?;
        match self.store.navigation().next_navigable() {
            Some(index) => self.store.go_to_index(index).map(|()| true),
            None => Ok(false),
        }
    }

    /// # Errors
    ///
    /// See [`SessionStateStore::go_to_index`].
    pub fn go_previous(&mut self, now: DateTime<Utc>) -> Result<bool, SessionStoreError> {
        self.observe(now)?;
        match self.store.navigation().previous_navigable() {
            Some(index) => self.store.go_to_index(index).map(|()| true),
            None => Ok(false),
        }
    }

    /// # Errors
    ///
    /// See [`SessionStateStore::submit_current`].
    pub fn submit_current(&mut self, now: DateTime<Utc>) -> Result<bool, SessionStoreError> {
        self.observe(now)?;
        self.store.submit_current()
    }

    /// Pause the session and freeze the countdown.
    ///
    /// # Errors
    ///
    /// `SessionEnded` if the session is over, including when the countdown
    /// expires at `now`.
    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<bool, SessionStoreError> {
        self.sync_timer(now)?;
        let paused = self.store.pause_session()?;
        if paused {
            if let Some(timer) = self.timer.as_mut() {
                timer.pause(now);
            }
        }
        Ok(paused)
    }

    /// # Errors
    ///
    /// `SessionEnded` if the session is over.
    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<bool, SessionStoreError> {
        let resumed = self.store.resume_session()?;
        if resumed {
            if let Some(timer) = self.timer.as_mut() {
                timer.resume(now);
            }
        }
        Ok(resumed)
    }

    fn stop_timer(&mut self, now: DateTime<Utc>) -> Result<(), SessionStoreError> {
        self.observe(now)?;
        if let Some(timer) = self.timer.as_mut() {
            timer.stop(now);
            self.store.record_remaining_time(timer.remaining_millis(now))?;
        }
        Ok(())
    }

    /// Submit the whole session.
    ///
    /// # Errors
    ///
    /// `SessionEnded` if the session already ended, including by expiry at `now`.
    pub fn finish(&mut self, now: DateTime<Utc>) -> Result<SessionSummary, SessionStoreError> {
        self.stop_timer(now)?;
        self.store.finish_session(now).cloned()
    }

    /// Leave the session early.
    ///
    /// # Errors
    ///
    /// `SessionEnded` if the session already ended, including by expiry at `now`.
    pub fn exit(&mut self, now: DateTime<Utc>) -> Result<SessionSummary, SessionStoreError> {
        self.stop_timer(now)?;
        self.store.exit_session(now).cloned()
    }
}
