use exam_core::model::QuestionStatus;

use super::store::SessionState;

/// How a navigator tile should render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileCategory {
    Current,
    SubmittedLocked,
    VisitedUnsubmitted,
    Unvisited,
}

/// One entry of the question navigator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationTile {
    pub index: usize,
    pub category: TileCategory,
    pub navigable: bool,
    pub is_marked_for_review: bool,
}

/// Decides which questions may be entered. Borrowed view, recomputed per state change.
///
/// Submitted questions are locked out of re-entry; everything else is reachable
/// in either direction.
#[derive(Debug, Clone, Copy)]
pub struct NavigationController<'a> {
    state: &'a SessionState,
}

impl<'a> NavigationController<'a> {
    #[must_use]
    pub fn new(state: &'a SessionState) -> Self {
        Self { state }
    }

    /// `false` for submitted questions and for indices past the end.
    #[must_use]
    pub fn is_navigable(&self, index: usize) -> bool {
        self.state
            .question_states()
            .get(index)
            .is_some_and(|qs| !qs.is_submitted())
    }

    /// Category for a valid index. Out-of-range indices report `Unvisited`.
    #[must_use]
    pub fn category(&self, index: usize) -> TileCategory {
        if index == self.state.current_index() {
            return TileCategory::Current;
        }
        let Some(qs) = self.state.question_states().get(index) else {
            return TileCategory::Unvisited;
        };
        if qs.is_submitted() {
            TileCategory::SubmittedLocked
        } else if qs.status() != QuestionStatus::Unvisited
            || self.state.visited_indices().contains(&index)
        {
            TileCategory::VisitedUnsubmitted
        } else {
            TileCategory::Unvisited
        }
    }

    #[must_use]
    pub fn tiles(&self) -> Vec<NavigationTile> {
        self.state
            .question_states()
            .iter()
            .enumerate()
            .map(|(index, qs)| NavigationTile {
                index,
                category: self.category(index),
                navigable: self.is_navigable(index),
                is_marked_for_review: qs.is_marked_for_review(),
            })
            .collect()
    }

    /// Nearest enterable index after the current one, if any.
    #[must_use]
    pub fn next_navigable(&self) -> Option<usize> {
        let len = self.state.question_states().len();
        (self.state.current_index() + 1..len).find(|i| self.is_navigable(*i))
    }

    /// Nearest enterable index before the current one, if any.
    #[must_use]
    pub fn previous_navigable(&self) -> Option<usize> {
        (0..self.state.current_index())
            .rev()
            .find(|i| self.is_navigable(*i))
    }
}
