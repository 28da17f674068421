use services::{SessionPhase, SessionSnapshot};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OptionVm {
    pub key: String,
    pub text: String,
    pub selected: bool,
}

/// The question currently on screen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuestionVm {
    pub number: usize,
    pub prompt: String,
    pub options: Vec<OptionVm>,
    /// Options cannot be changed (submitted question or ended session).
    pub locked: bool,
}

impl QuestionVm {
    #[must_use]
    pub fn from_snapshot(snapshot: &SessionSnapshot) -> Self {
        let state = snapshot.current_state();
        let question = &snapshot.current_question;
        let options = question
            .options()
            .iter()
            .map(|option| OptionVm {
                key: option.key.as_str().to_string(),
                text: option.text.clone(),
                selected: state.selected_answer() == Some(&option.key),
            })
            .collect();

        Self {
            number: snapshot.current_index + 1,
            prompt: question.prompt().to_string(),
            options,
            locked: state.is_submitted() || matches!(snapshot.phase, SessionPhase::Ended(_)),
        }
    }
}
