use exam_core::model::{AnswerKey, SessionSummary};
use services::{ExamSession, SessionError, SessionLoopService, SessionStoreError};
use thiserror::Error;

/// A user action on the session screen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionIntent {
    Answer(AnswerKey),
    ToggleMark,
    Submit,
    GoTo(usize),
    Next,
    Previous,
    Pause,
    Resume,
    Finish,
    Exit,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IntentError {
    #[error("empty command")]
    Empty,
    #[error("unknown command: {0}")]
    Unknown(String),
    #[error("{0} needs an argument")]
    MissingArgument(&'static str),
    #[error("invalid question number: {0}")]
    InvalidNumber(String),
}

impl SessionIntent {
    /// Parse a typed command. Question numbers are 1-based.
    ///
    /// # Errors
    ///
    /// Returns `IntentError` for blank, unknown or incomplete commands.
    pub fn parse(line: &str) -> Result<Self, IntentError> {
        let mut parts = line.split_whitespace();
        let command = parts.next().ok_or(IntentError::Empty)?;
        let arg = parts.next();

        let intent = match command.to_ascii_lowercase().as_str() {
            "a" | "answer" => {
                let raw = arg.ok_or(IntentError::MissingArgument("answer"))?;
                let key = AnswerKey::new(raw.to_ascii_uppercase())
                    .map_err(|_| IntentError::MissingArgument("answer"))?;
                Self::Answer(key)
            }
            "m" | "mark" => Self::ToggleMark,
            "s" | "submit" => Self::Submit,
            "g" | "goto" => {
                let raw = arg.ok_or(IntentError::MissingArgument("goto"))?;
                let number: usize = raw
                    .parse()
                    .map_err(|_| IntentError::InvalidNumber(raw.to_string()))?;
                let index = number
                    .checked_sub(1)
                    .ok_or_else(|| IntentError::InvalidNumber(raw.to_string()))?;
                Self::GoTo(index)
            }
            "n" | "next" => Self::Next,
            "p" | "prev" | "previous" => Self::Previous,
            "pause" => Self::Pause,
            "resume" => Self::Resume,
            "f" | "finish" => Self::Finish,
            "q" | "quit" | "exit" => Self::Exit,
            other => return Err(IntentError::Unknown(other.to_string())),
        };
        Ok(intent)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionOutcome {
    Continue,
    Ended(SessionSummary),
}

fn dispatch(
    session_loop: &SessionLoopService,
    session: &mut ExamSession,
    intent: SessionIntent,
) -> Result<(), SessionError> {
    let now = session_loop.clock().now();
    let current = session.store().state().current_index();

    match intent {
        SessionIntent::Answer(key) => session.select_answer(current, key, now)?,
        SessionIntent::ToggleMark => {
            session.toggle_mark_for_review(current, now)?;
        }
        SessionIntent::Submit => {
            session.submit_current(now)?;
        }
        SessionIntent::GoTo(index) => session.go_to_index(index, now)?,
        SessionIntent::Next => {
            session.go_next(now)?;
        }
        SessionIntent::Previous => {
            session.go_previous(now)?;
        }
        SessionIntent::Pause => {
            session.pause(now)?;
        }
        SessionIntent::Resume => {
            session.resume(now)?;
        }
        SessionIntent::Finish => {
            session_loop.finish(session)?;
        }
        SessionIntent::Exit => {
            session_loop.exit(session)?;
        }
    }
    Ok(())
}

/// Apply an intent against the session using the service clock.
///
/// The countdown is forwarded before the action, so a session whose time ran
/// out since the last tick ends as expired and the action is dropped.
///
/// # Errors
///
/// Returns `SessionError::Store` when a running session rejects the action;
/// the session is unchanged in that case.
pub fn apply_intent(
    session_loop: &SessionLoopService,
    session: &mut ExamSession,
    intent: SessionIntent,
) -> Result<SessionOutcome, SessionError> {
    let applied = dispatch(session_loop, session, intent);
    match (applied, session.summary()) {
        (Ok(()) | Err(SessionError::Store(SessionStoreError::SessionEnded)), Some(summary)) => {
            Ok(SessionOutcome::Ended(summary.clone()))
        }
        (Ok(()), None) => Ok(SessionOutcome::Continue),
        (Err(err), _) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::test_support::{key, loop_service, loop_service_at, start_test};
    use chrono::Duration;
    use exam_core::model::EndReason;
    use exam_core::time::fixed_now;

    #[test]
    fn parses_commands() {
        assert_eq!(SessionIntent::parse("a b"), Ok(SessionIntent::Answer(key("B"))));
        assert_eq!(SessionIntent::parse(" goto 3 "), Ok(SessionIntent::GoTo(2)));
        assert_eq!(SessionIntent::parse("N"), Ok(SessionIntent::Next));
        assert_eq!(SessionIntent::parse("quit"), Ok(SessionIntent::Exit));
        assert_eq!(SessionIntent::parse(""), Err(IntentError::Empty));
        assert_eq!(
            SessionIntent::parse("goto 0"),
            Err(IntentError::InvalidNumber("0".into()))
        );
        assert_eq!(
            SessionIntent::parse("answer"),
            Err(IntentError::MissingArgument("answer"))
        );
        assert_eq!(
            SessionIntent::parse("dance"),
            Err(IntentError::Unknown("dance".into()))
        );
    }

    #[test]
    fn intents_drive_the_session() {
        let svc = loop_service();
        let mut session = start_test(3, 60_000);

        let steps = [
            SessionIntent::Answer(key("B")),
            SessionIntent::Submit,
            SessionIntent::Next,
            SessionIntent::ToggleMark,
        ];
        for intent in steps {
            assert_eq!(
                apply_intent(&svc, &mut session, intent).unwrap(),
                SessionOutcome::Continue
            );
        }
        assert_eq!(session.store().state().current_index(), 1);

        let err = apply_intent(&svc, &mut session, SessionIntent::GoTo(0)).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Store(SessionStoreError::NavigationBlocked { index: 0 })
        ));

        match apply_intent(&svc, &mut session, SessionIntent::Finish).unwrap() {
            SessionOutcome::Ended(summary) => {
                assert_eq!(summary.end_reason(), EndReason::Submitted);
                assert_eq!(summary.correct_count(), 1);
            }
            SessionOutcome::Continue => panic!("session should have ended"),
        }
    }

    #[test]
    fn answer_after_deadline_ends_the_session_ungraded() {
        // The clock is past the deadline but no tick has been delivered yet.
        let svc = loop_service_at(fixed_now() + Duration::seconds(5));
        let mut session = start_test(2, 1_000);

        match apply_intent(&svc, &mut session, SessionIntent::Answer(key("B"))).unwrap() {
            SessionOutcome::Ended(summary) => {
                assert_eq!(summary.end_reason(), EndReason::TimeExpired);
                assert_eq!(summary.correct_count(), 0);
                assert_eq!(summary.per_question()[0].selected_answer, None);
            }
            SessionOutcome::Continue => panic!("expired session accepted an answer"),
        }
        assert!(svc.tick(&mut session).unwrap().is_empty());
        assert_eq!(session.summary().map(SessionSummary::correct_count), Some(0));
    }

    #[test]
    fn finishing_after_deadline_reports_expiry() {
        let svc = loop_service_at(fixed_now() + Duration::seconds(90));
        let mut session = start_test(1, 60_000);

        let outcome = apply_intent(&svc, &mut session, SessionIntent::Finish).unwrap();
        assert!(matches!(
            outcome,
            SessionOutcome::Ended(summary) if summary.end_reason() == EndReason::TimeExpired
        ));
    }
}
