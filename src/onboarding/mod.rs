//! Onboarding workflow: account creation, login and profile fetch.
//!
//! The form validates input with [`crate::validation::ValidationGateway`]
//! and hands a clean [`RegistrationRequest`] to the
//! [`OnboardingOrchestrator`], which runs the three remote calls in order
//! and reports a single outcome.

pub mod model;
pub mod orchestrator;
pub mod state;

pub use model::{AttemptRecord, FailureKind, RegistrationRequest, StateTransition, WorkflowStep};
pub use orchestrator::{OnboardingEvent, OnboardingOrchestrator, SubmitOutcome};
pub use state::SubmissionState;
