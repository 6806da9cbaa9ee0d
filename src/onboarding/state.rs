//! Submission state machine guarding re-entrancy of the onboarding workflow.

use serde::{Deserialize, Serialize};

/// Lifecycle of a sign-up submission.
///
/// Idle → InFlight → (Succeeded | Failed). Failed → InFlight starts a new
/// attempt. Succeeded accepts nothing further.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    #[default]
    Idle,
    InFlight,
    Succeeded,
    Failed,
}

impl SubmissionState {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: SubmissionState) -> bool {
        use SubmissionState::*;
        matches!(
            (self, target),
            (Idle, InFlight) | (Failed, InFlight) | (InFlight, Succeeded) | (InFlight, Failed)
        )
    }

    /// Whether an attempt has resolved.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Whether a new `submit` may start from this state.
    pub fn accepts_submission(&self) -> bool {
        self.can_transition_to(Self::InFlight)
    }
}

impl std::fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::InFlight => "in_flight",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}
