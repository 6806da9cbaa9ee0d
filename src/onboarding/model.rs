//! Registration input and workflow bookkeeping types.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::SubmissionState;

/// Raw sign-up input collected by the form.
///
/// Immutable once built; the password never appears in `Debug` output.
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    name: String,
    email: String,
    password: SecretString,
}

impl RegistrationRequest {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: SecretString::from(password.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password(&self) -> &SecretString {
        &self.password
    }
}

/// One remote call of the onboarding workflow, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    CreateAccount,
    Authenticate,
    FetchProfile,
}

impl WorkflowStep {
    /// All steps in the order they run.
    pub const ORDER: [WorkflowStep; 3] = [
        WorkflowStep::CreateAccount,
        WorkflowStep::Authenticate,
        WorkflowStep::FetchProfile,
    ];
}

impl std::fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::CreateAccount => "create_account",
            Self::Authenticate => "authenticate",
            Self::FetchProfile => "fetch_profile",
        };
        write!(f, "{s}")
    }
}

/// Why an attempt failed, as far as the caller is told.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Generic "try again".
    RegistrationFailed,
    /// The account exists but no session could be established.
    /// Only reported under `OrphanPolicy::Surface`.
    AccountCreatedWithoutSession,
}

/// A state transition event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: SubmissionState,
    pub to: SubmissionState,
    pub timestamp: DateTime<Utc>,
}

/// Progress record of a single submission attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub attempt_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Steps that returned successfully, in order.
    pub completed: Vec<WorkflowStep>,
    /// Step whose failure ended the attempt.
    pub failed_at: Option<WorkflowStep>,
    pub state: SubmissionState,
}

impl AttemptRecord {
    pub fn start() -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            completed: Vec::new(),
            failed_at: None,
            state: SubmissionState::InFlight,
        }
    }

    /// True when the account was created but a later step failed.
    pub fn is_partial_success(&self) -> bool {
        self.failed_at.is_some() && self.completed.contains(&WorkflowStep::CreateAccount)
    }
}
