//! Coaching session state machine.

use serde::Serialize;

/// The phases of a coaching session.
///
/// NotStarted → Asking → Generating → Done | Error. The question index
/// advances inside `Asking`; `Done` and `Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoachPhase {
    #[default]
    NotStarted,
    Asking,
    Generating,
    Done,
    Error,
}

impl CoachPhase {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: CoachPhase) -> bool {
        use CoachPhase::*;
        matches!(
            (self, target),
            (NotStarted, Asking) | (Asking, Generating) | (Generating, Done) | (Generating, Error)
        )
    }

    /// Whether voice capture should resume after the assistant speaks.
    pub fn accepts_answers(&self) -> bool {
        matches!(self, Self::Asking)
    }
}

impl std::fmt::Display for CoachPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotStarted => "not_started",
            Self::Asking => "asking",
            Self::Generating => "generating",
            Self::Done => "done",
            Self::Error => "error",
        };
        write!(f, "{s}")
    }
}
