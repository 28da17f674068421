use exam_core::model::{Question, QuestionState, QuestionStatus, SessionId, SessionMode};

use super::navigation::NavigationTile;
use super::store::SessionPhase;

/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub marked_for_review: usize,
    pub submitted: usize,
    pub unvisited: usize,
    pub is_complete: bool,
}

impl SessionProgress {
    #[must_use]
    pub fn from_states(states: &[QuestionState], is_complete: bool) -> Self {
        let mut progress = Self {
            total: states.len(),
            answered: 0,
            marked_for_review: 0,
            submitted: 0,
            unvisited: 0,
            is_complete,
        };
        for state in states {
            if state.selected_answer().is_some() {
                progress.answered += 1;
            }
            if state.is_marked_for_review() {
                progress.marked_for_review += 1;
            }
            match state.status() {
                QuestionStatus::Submitted => progress.submitted += 1,
                QuestionStatus::Unvisited => progress.unvisited += 1,
                QuestionStatus::Visited | QuestionStatus::Answered => {}
            }
        }
        progress
    }
}

/// Read-only copy of the session handed to header, footer and navigator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub mode: SessionMode,
    pub phase: SessionPhase,
    pub current_index: usize,
    pub total_questions: usize,
    pub remaining_time_millis: Option<u64>,
    pub current_question: Question,
    pub question_states: Vec<QuestionState>,
    pub tiles: Vec<NavigationTile>,
    pub progress: SessionProgress,
}

impl SessionSnapshot {
    #[must_use]
    pub fn current_state(&self) -> &QuestionState {
        &self.question_states[self.current_index]
    }
}
