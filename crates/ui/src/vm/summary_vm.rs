use exam_core::model::{Correctness, EndReason, SessionSummary};
use services::{SessionResultId, SessionResultListItem};

use crate::vm::time_fmt::{format_datetime, format_elapsed};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SummaryRowVm {
    pub number: usize,
    pub selected: String,
    pub correct: String,
    pub outcome: &'static str,
    pub marked: bool,
}

/// End-of-session results screen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SummaryVm {
    pub headline: &'static str,
    pub answered_label: String,
    pub correct: u32,
    pub incorrect: u32,
    pub accuracy_label: String,
    pub time_taken_label: String,
    pub rows: Vec<SummaryRowVm>,
}

fn headline(reason: EndReason) -> &'static str {
    match reason {
        EndReason::Submitted => "Session submitted",
        EndReason::UserExit => "Session exited",
        EndReason::TimeExpired => "Time is up",
    }
}

fn outcome_label(correctness: Correctness) -> &'static str {
    match correctness {
        Correctness::Correct => "correct",
        Correctness::Incorrect => "incorrect",
        Correctness::Unanswered => "unanswered",
    }
}

#[must_use]
pub fn format_accuracy(percent: f64) -> String {
    format!("{percent:.1}%")
}

impl From<&SessionSummary> for SummaryVm {
    fn from(summary: &SessionSummary) -> Self {
        let rows = summary
            .per_question()
            .iter()
            .enumerate()
            .map(|(i, outcome)| SummaryRowVm {
                number: i + 1,
                selected: outcome
                    .selected_answer
                    .as_ref()
                    .map_or_else(|| "-".to_string(), ToString::to_string),
                correct: outcome.correct_answer.to_string(),
                outcome: outcome_label(outcome.correctness),
                marked: outcome.is_marked_for_review,
            })
            .collect();

        Self {
            headline: headline(summary.end_reason()),
            answered_label: format!(
                "{} / {}",
                summary.questions_answered(),
                summary.total_questions()
            ),
            correct: summary.correct_count(),
            incorrect: summary.incorrect_count(),
            accuracy_label: format_accuracy(summary.accuracy_percent()),
            time_taken_label: format_elapsed(summary.time_taken_millis()),
            rows,
        }
    }
}

/// One entry of the past-results list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResultCardVm {
    pub id: SessionResultId,
    pub ended_at_str: String,
    pub mode: &'static str,
    pub headline: &'static str,
    pub score_label: String,
    pub accuracy_label: String,
}

impl From<&SessionResultListItem> for ResultCardVm {
    fn from(item: &SessionResultListItem) -> Self {
        Self {
            id: item.id,
            ended_at_str: format_datetime(item.ended_at),
            mode: item.mode.as_str(),
            headline: headline(item.end_reason),
            score_label: format!("{} / {}", item.correct, item.total_questions),
            accuracy_label: format_accuracy(item.accuracy_percent),
        }
    }
}

#[must_use]
pub fn map_result_cards(items: &[SessionResultListItem]) -> Vec<ResultCardVm> {
    items.iter().map(ResultCardVm::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::test_support::{key, start_test};
    use chrono::Duration;
    use exam_core::time::fixed_now;

    #[test]
    fn summary_formats_counts_and_rows() {
        let mut session = start_test(3, 60_000);
        session.select_answer(0, key("B"), fixed_now()).unwrap();
        session.toggle_mark_for_review(0, fixed_now()).unwrap();
        session.go_to_index(1, fixed_now()).unwrap();
        session.select_answer(1, key("A"), fixed_now()).unwrap();
        session.tick(fixed_now() + Duration::seconds(61)).unwrap();

        let vm = SummaryVm::from(session.summary().unwrap());
        assert_eq!(vm.headline, "Time is up");
        assert_eq!(vm.answered_label, "2 / 3");
        assert_eq!((vm.correct, vm.incorrect), (1, 1));
        assert_eq!(vm.accuracy_label, "50.0%");
        assert_eq!(vm.time_taken_label, "01:00");
        assert_eq!(vm.rows[0].outcome, "correct");
        assert!(vm.rows[0].marked);
        assert_eq!(vm.rows[2].selected, "-");
        assert_eq!(vm.rows[2].correct, "B");
        assert_eq!(vm.rows[2].outcome, "unanswered");
    }

    #[test]
    fn result_card_uses_list_item_fields() {
        let item = SessionResultListItem {
            id: 4,
            session_id: exam_core::model::SessionId::generate(),
            mode: exam_core::model::SessionMode::Study,
            end_reason: EndReason::UserExit,
            ended_at: fixed_now(),
            total_questions: 5,
            correct: 2,
            incorrect: 1,
            accuracy_percent: 200.0 / 3.0,
        };
        let cards = map_result_cards(&[item]);
        assert_eq!(cards[0].id, 4);
        assert_eq!(cards[0].mode, "study");
        assert_eq!(cards[0].score_label, "2 / 5");
        assert_eq!(cards[0].accuracy_label, "66.7%");
        assert_eq!(cards[0].ended_at_str, format_datetime(fixed_now()));
    }
}
