use thiserror::Error;

use crate::model::{QuestionError, QuestionStateError, SessionConfigError, SummaryError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    QuestionState(#[from] QuestionStateError),
    #[error(transparent)]
    SessionConfig(#[from] SessionConfigError),
    #[error(transparent)]
    Summary(#[from] SummaryError),
}
