mod ids;
mod question;
mod question_state;
mod session;
mod summary;

pub use ids::{ExamId, ParseIdError, QuestionId, SessionId};

pub use question::{AnswerKey, AnswerOption, Question, QuestionDraft, QuestionError};
pub use question_state::{QuestionState, QuestionStateError, QuestionStatus};
pub use session::{
    EndReason, SessionConfig, SessionConfigDraft, SessionConfigError, SessionMode,
};
pub use summary::{Correctness, QuestionOutcome, SessionSummary, SummaryError};
