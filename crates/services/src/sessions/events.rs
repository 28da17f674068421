use exam_core::model::{EndReason, SessionSummary};

/// One-way notifications from the store to display and persistence collaborators.
///
/// Collected in dispatch order and drained by the owner after each operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    RemainingTimeChanged { remaining_millis: u64 },
    QuestionSubmitted { index: usize },
    Paused,
    Resumed,
    SessionEnded {
        reason: EndReason,
        summary: SessionSummary,
    },
}

impl SessionEvent {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::SessionEnded { .. })
    }
}
