use services::{SessionPhase, SessionSnapshot};

use crate::context::SessionContext;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FooterVm {
    pub user_label: String,
    pub pause_label: &'static str,
    pub pause_enabled: bool,
    pub previous_enabled: bool,
    pub next_enabled: bool,
    pub finish_enabled: bool,
    pub exit_enabled: bool,
}

impl FooterVm {
    #[must_use]
    pub fn from_snapshot(snapshot: &SessionSnapshot, display_name: &str) -> Self {
        let open = !matches!(snapshot.phase, SessionPhase::Ended(_));
        let current = snapshot.current_index;
        let navigable = |i: &usize| snapshot.tiles[*i].navigable;

        Self {
            user_label: display_name.to_string(),
            pause_label: if snapshot.phase == SessionPhase::Paused {
                "Resume"
            } else {
                "Pause"
            },
            pause_enabled: open,
            previous_enabled: open && (0..current).any(|i| navigable(&i)),
            next_enabled: open && (current + 1..snapshot.tiles.len()).any(|i| navigable(&i)),
            finish_enabled: open,
            exit_enabled: open,
        }
    }

    #[must_use]
    pub fn with_context(snapshot: &SessionSnapshot, ctx: &SessionContext) -> Self {
        Self::from_snapshot(snapshot, ctx.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::test_support::start_test;
    use exam_core::time::fixed_now;

    #[test]
    fn navigation_buttons_skip_locked_questions() {
        let mut session = start_test(3, 60_000);
        session.go_to_index(1, fixed_now()).unwrap();
        session.submit_current(fixed_now()).unwrap();
        session.go_to_index(0, fixed_now()).unwrap();

        let vm = FooterVm::from_snapshot(&session.snapshot(), "Sam");
        assert_eq!(vm.user_label, "Sam");
        assert!(!vm.previous_enabled);
        assert!(vm.next_enabled);
        assert_eq!(vm.pause_label, "Pause");
    }

    #[test]
    fn paused_and_ended_states() {
        let mut session = start_test(2, 60_000);
        session.pause(fixed_now()).unwrap();
        let vm = FooterVm::from_snapshot(&session.snapshot(), "Sam");
        assert_eq!(vm.pause_label, "Resume");
        assert!(vm.finish_enabled);

        session.exit(fixed_now()).unwrap();
        let vm = FooterVm::from_snapshot(&session.snapshot(), "Sam");
        assert!(!vm.pause_enabled);
        assert!(!vm.next_enabled);
        assert!(!vm.exit_enabled);
    }
}
