mod footer_vm;
mod header_vm;
mod navigator_vm;
mod question_vm;
mod session_vm;
mod summary_vm;
mod time_fmt;

pub use footer_vm::FooterVm;
pub use header_vm::{HeaderVm, LOW_TIME_MILLIS};
pub use navigator_vm::{NavigatorTileVm, NavigatorVm};
pub use question_vm::{OptionVm, QuestionVm};
pub use session_vm::{IntentError, SessionIntent, SessionOutcome, apply_intent};
pub use summary_vm::{ResultCardVm, SummaryRowVm, SummaryVm, format_accuracy, map_result_cards};
pub use time_fmt::{format_countdown, format_datetime, format_elapsed};

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use chrono::{DateTime, Utc};
    use exam_core::model::{
        AnswerKey, ExamId, Question, QuestionDraft, QuestionId, SessionConfigDraft, SessionId,
    };
    use exam_core::time::fixed_now;
    use services::{Clock, ExamSession, SessionLoopService};
    use storage::repository::InMemoryRepository;

    pub(crate) fn key(raw: &str) -> AnswerKey {
        AnswerKey::new(raw).unwrap()
    }

    fn question(id: u64) -> Question {
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

    fn start(draft: SessionConfigDraft) -> ExamSession {
        let config = draft.validate().unwrap();
        let questions = config
            .question_ids()
            .iter()
            .map(|id| question(id.value()))
            .collect();
        ExamSession::start(SessionId::generate(), &config, questions, fixed_now()).unwrap()
    }

    pub(crate) fn start_test(n: u64, duration_millis: u64) -> ExamSession {
        start(SessionConfigDraft::test(
            duration_millis,
            (1..=n).map(QuestionId::new).collect(),
        ))
    }

    pub(crate) fn start_study(n: u64) -> ExamSession {
        start(SessionConfigDraft::study((1..=n).map(QuestionId::new).collect()))
    }

    pub(crate) fn loop_service() -> SessionLoopService {
        loop_service_at(fixed_now())
    }

    pub(crate) fn loop_service_at(now: DateTime<Utc>) -> SessionLoopService {
        let repo = InMemoryRepository::new();
        SessionLoopService::new(
            Clock::fixed(now),
            Arc::new(repo.clone()),
            Arc::new(repo),
        )
    }
}
