use services::{SessionPhase, SessionSnapshot};

use exam_core::model::SessionMode;

use crate::vm::time_fmt::format_countdown;

/// Countdown turns urgent below this.
pub const LOW_TIME_MILLIS: u64 = 60_000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderVm {
    pub position_label: String,
    pub progress_label: String,
    pub timer_label: Option<String>,
    pub timer_is_low: bool,
    pub is_paused: bool,
    pub mark_label: &'static str,
    pub mark_enabled: bool,
    pub submit_visible: bool,
    pub submit_enabled: bool,
}

impl HeaderVm {
    #[must_use]
    pub fn from_snapshot(snapshot: &SessionSnapshot) -> Self {
        let ended = matches!(snapshot.phase, SessionPhase::Ended(_));
        let current = snapshot.current_state();
        let locked = ended || current.is_submitted();
        let progress = snapshot.progress;

        Self {
            position_label: format!(
                "Question {} of {}",
                snapshot.current_index + 1,
                snapshot.total_questions
            ),
            progress_label: format!(
                "{} answered, {} marked",
                progress.answered, progress.marked_for_review
            ),
            timer_label: snapshot.remaining_time_millis.map(format_countdown),
            timer_is_low: snapshot
                .remaining_time_millis
                .is_some_and(|ms| ms < LOW_TIME_MILLIS),
            is_paused: snapshot.phase == SessionPhase::Paused,
            mark_label: if current.is_marked_for_review() {
                "Unmark"
            } else {
                "Mark for review"
            },
            mark_enabled: !locked,
            submit_visible: snapshot.mode == SessionMode::Test,
            submit_enabled: snapshot.mode == SessionMode::Test && !locked,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::test_support::{key, start_study, start_test};
    use exam_core::time::fixed_now;

    #[test]
    fn header_tracks_position_timer_and_mark_state() {
        let mut session = start_test(3, 75_000);
        session.go_to_index(1, fixed_now()).unwrap();
        session.select_answer(1, key("A"), fixed_now()).unwrap();
        session.toggle_mark_for_review(1, fixed_now()).unwrap();

        let vm = HeaderVm::from_snapshot(&session.snapshot());
        assert_eq!(vm.position_label, "Question 2 of 3");
        assert_eq!(vm.progress_label, "1 answered, 1 marked");
        assert_eq!(vm.timer_label.as_deref(), Some("01:15"));
        assert!(!vm.timer_is_low);
        assert_eq!(vm.mark_label, "Unmark");
        assert!(vm.mark_enabled);
        assert!(vm.submit_enabled);
    }

    #[test]
    fn submitted_question_disables_mark_and_submit() {
        let mut session = start_test(2, 30_000);
        session.submit_current(fixed_now()).unwrap();

        let vm = HeaderVm::from_snapshot(&session.snapshot());
        assert!(!vm.mark_enabled);
        assert!(!vm.submit_enabled);
        assert!(vm.timer_is_low);
    }

    #[test]
    fn study_mode_hides_submit_and_timer() {
        let mut session = start_study(2);
        session.pause(fixed_now()).unwrap();

        let vm = HeaderVm::from_snapshot(&session.snapshot());
        assert!(!vm.submit_visible);
        assert_eq!(vm.timer_label, None);
        assert!(vm.is_paused);
    }
}
