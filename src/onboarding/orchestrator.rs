//! OnboardingOrchestrator: runs create account → authenticate → fetch
//! profile as one fail-fast sequence and owns the submission state.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::model::{
    AttemptRecord, FailureKind, RegistrationRequest, StateTransition, WorkflowStep,
};
use super::state::SubmissionState;
use crate::config::{ClientConfig, OrphanPolicy};
use crate::error::{self, RemoteCallError};
use crate::services::{
    CredentialService, ProfileService, RestAccountApi, Session, SessionService, UserProfile,
};
use crate::transport::ReqwestTransport;

/// Default broadcast channel capacity.
const DEFAULT_EVENT_CAPACITY: usize = 16;

/// Notifications for the presentation shell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OnboardingEvent {
    /// Workflow completed; the shell should proceed to home.
    NavigateHome { user_id: String },
    /// Workflow failed; the shell may let the user resubmit.
    Failed { attempt_id: Uuid, kind: FailureKind },
}

/// Result of a call to [`OnboardingOrchestrator::submit`].
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    Completed {
        session: Session,
        profile: UserProfile,
    },
    Failed {
        attempt_id: Uuid,
        kind: FailureKind,
        /// Steps that succeeded before the failure.
        completed: Vec<WorkflowStep>,
        failed_at: WorkflowStep,
    },
    /// Not started: another attempt is in flight or onboarding already
    /// succeeded.
    Ignored { state: SubmissionState },
}

impl SubmitOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    pub fn is_ignored(&self) -> bool {
        matches!(self, Self::Ignored { .. })
    }
}

#[derive(Debug, Default)]
struct Inner {
    state: SubmissionState,
    transitions: Vec<StateTransition>,
    last_attempt: Option<AttemptRecord>,
}

impl Inner {
    fn transition(&mut self, to: SubmissionState) -> bool {
        if !self.state.can_transition_to(to) {
            warn!(from = %self.state, to = %to, "Rejected submission state transition");
            return false;
        }
        self.transitions.push(StateTransition {
            from: self.state,
            to,
            timestamp: Utc::now(),
        });
        self.state = to;
        true
    }
}

/// Drives the onboarding workflow for one form.
pub struct OnboardingOrchestrator {
    credentials: Arc<dyn CredentialService>,
    sessions: Arc<dyn SessionService>,
    profiles: Arc<dyn ProfileService>,
    step_timeout: Duration,
    orphan_policy: OrphanPolicy,
    inner: Mutex<Inner>,
    events: broadcast::Sender<OnboardingEvent>,
}

impl OnboardingOrchestrator {
    pub fn new(
        credentials: Arc<dyn CredentialService>,
        sessions: Arc<dyn SessionService>,
        profiles: Arc<dyn ProfileService>,
    ) -> Self {
        let defaults = ClientConfig::default();
        let (events, _rx) = broadcast::channel(DEFAULT_EVENT_CAPACITY);
        Self {
            credentials,
            sessions,
            profiles,
            step_timeout: defaults.step_timeout,
            orphan_policy: defaults.orphan_policy,
            inner: Mutex::new(Inner::default()),
            events,
        }
    }

    /// Orchestrator backed by the REST account API, configured from the
    /// process environment.
    pub fn from_env() -> error::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading settings through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> error::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = ClientConfig::from_lookup(lookup)?;
        Ok(Self::from_config(&config))
    }

    /// Orchestrator backed by the REST account API described by `config`.
    pub fn from_config(config: &ClientConfig) -> Self {
        info!(api = %config.api_base_url, "Using account API");
        let api = Arc::new(RestAccountApi::new(Arc::new(ReqwestTransport::from_config(
            config,
        ))));
        Self::new(api.clone(), api.clone(), api).with_config(config)
    }

    /// Apply the orchestration settings of `config`.
    pub fn with_config(self, config: &ClientConfig) -> Self {
        self.with_step_timeout(config.step_timeout)
            .with_orphan_policy(config.orphan_policy)
    }

    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = timeout;
        self
    }

    pub fn with_orphan_policy(mut self, policy: OrphanPolicy) -> Self {
        self.orphan_policy = policy;
        self
    }

    /// Subscribe to workflow notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<OnboardingEvent> {
        self.events.subscribe()
    }

    pub fn orphan_policy(&self) -> OrphanPolicy {
        self.orphan_policy
    }

    pub fn state(&self) -> SubmissionState {
        self.lock().state
    }

    /// Every state transition so far, oldest first.
    pub fn transitions(&self) -> Vec<StateTransition> {
        self.lock().transitions.clone()
    }

    /// Record of the most recent accepted attempt.
    pub fn last_attempt(&self) -> Option<AttemptRecord> {
        self.lock().last_attempt.clone()
    }

    /// Run the onboarding workflow for an already-validated `request`.
    ///
    /// While an attempt is in flight, further calls return
    /// [`SubmitOutcome::Ignored`] without touching state or services.
    pub async fn submit(&self, request: RegistrationRequest) -> SubmitOutcome {
        let attempt_id = match self.begin() {
            Ok(id) => id,
            Err(state) => {
                warn!(%state, "Submission ignored");
                return SubmitOutcome::Ignored { state };
            }
        };
        let guard = InFlightGuard {
            orchestrator: self,
            attempt_id,
            resolved: false,
        };
        info!(%attempt_id, "Onboarding submission accepted");

        let created = self.run_step(
            attempt_id,
            WorkflowStep::CreateAccount,
            self.credentials
                .create(request.name(), request.email(), request.password()),
        );
        let Some(account_id) = created.await else {
            return guard.fail(WorkflowStep::CreateAccount, FailureKind::RegistrationFailed);
        };
        debug!(%attempt_id, %account_id, "Account created");

        let authenticated = self.run_step(
            attempt_id,
            WorkflowStep::Authenticate,
            self.sessions.authenticate(request.email(), request.password()),
        );
        let Some(session) = authenticated.await else {
            warn!(%attempt_id, %account_id, "Account created but no session was established");
            let kind = match self.orphan_policy {
                OrphanPolicy::Conceal => FailureKind::RegistrationFailed,
                OrphanPolicy::Surface => FailureKind::AccountCreatedWithoutSession,
            };
            return guard.fail(WorkflowStep::Authenticate, kind);
        };

        let fetched = self.run_step(
            attempt_id,
            WorkflowStep::FetchProfile,
            self.profiles.fetch_current(&session),
        );
        let Some(profile) = fetched.await else {
            return guard.fail(WorkflowStep::FetchProfile, FailureKind::RegistrationFailed);
        };

        guard.succeed(session, profile)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim the InFlight slot, or report the state that refused it.
    fn begin(&self) -> Result<Uuid, SubmissionState> {
        let mut inner = self.lock();
        if !inner.state.accepts_submission() || !inner.transition(SubmissionState::InFlight) {
            return Err(inner.state);
        }
        let record = AttemptRecord::start();
        let id = record.attempt_id;
        inner.last_attempt = Some(record);
        Ok(id)
    }

    async fn run_step<T, F>(&self, attempt_id: Uuid, step: WorkflowStep, call: F) -> Option<T>
    where
        F: Future<Output = Result<T, RemoteCallError>>,
    {
        debug!(%attempt_id, %step, "Onboarding step started");
        match tokio::time::timeout(self.step_timeout, call).await {
            Ok(Ok(value)) => {
                if let Some(record) = self.lock().last_attempt.as_mut() {
                    record.completed.push(step);
                }
                Some(value)
            }
            Ok(Err(e)) => {
                warn!(%attempt_id, %step, error = %e, "Onboarding step failed");
                None
            }
            Err(_) => {
                warn!(
                    %attempt_id,
                    %step,
                    timeout = ?self.step_timeout,
                    "Onboarding step timed out"
                );
                None
            }
        }
    }

    /// Resolve the in-flight attempt. Returns the steps that completed.
    fn finish(&self, to: SubmissionState, failed_at: Option<WorkflowStep>) -> Vec<WorkflowStep> {
        let mut inner = self.lock();
        inner.transition(to);
        match inner.last_attempt.as_mut() {
            Some(record) => {
                record.state = to;
                record.failed_at = failed_at;
                record.finished_at = Some(Utc::now());
                record.completed.clone()
            }
            None => Vec::new(),
        }
    }

    fn notify(&self, event: OnboardingEvent) {
        // Ok if nobody is listening
        let _ = self.events.send(event);
    }
}

/// Moves the orchestrator out of InFlight even if `submit` is dropped
/// mid-workflow.
struct InFlightGuard<'a> {
    orchestrator: &'a OnboardingOrchestrator,
    attempt_id: Uuid,
    resolved: bool,
}

impl InFlightGuard<'_> {
    fn fail(mut self, step: WorkflowStep, kind: FailureKind) -> SubmitOutcome {
        self.resolved = true;
        let completed = self.orchestrator.finish(SubmissionState::Failed, Some(step));
        warn!(
            attempt_id = %self.attempt_id,
            failed_at = %step,
            completed = completed.len(),
            "Onboarding failed"
        );
        self.orchestrator.notify(OnboardingEvent::Failed {
            attempt_id: self.attempt_id,
            kind,
        });
        SubmitOutcome::Failed {
            attempt_id: self.attempt_id,
            kind,
            completed,
            failed_at: step,
        }
    }

    fn succeed(mut self, session: Session, profile: UserProfile) -> SubmitOutcome {
        self.resolved = true;
        self.orchestrator.finish(SubmissionState::Succeeded, None);
        info!(attempt_id = %self.attempt_id, user_id = %profile.id, "Onboarding completed");
        self.orchestrator.notify(OnboardingEvent::NavigateHome {
            user_id: profile.id.clone(),
        });
        SubmitOutcome::Completed { session, profile }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if self.resolved {
            return;
        }
        let pending = self
            .orchestrator
            .last_attempt()
            .and_then(|record| {
                WorkflowStep::ORDER
                    .into_iter()
                    .find(|step| !record.completed.contains(step))
            })
            .unwrap_or(WorkflowStep::CreateAccount);
        warn!(
            attempt_id = %self.attempt_id,
            step = %pending,
            "Onboarding submission dropped mid-flight"
        );
        self.orchestrator.finish(SubmissionState::Failed, Some(pending));
        self.orchestrator.notify(OnboardingEvent::Failed {
            attempt_id: self.attempt_id,
            kind: FailureKind::RegistrationFailed,
        });
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use secrecy::SecretString;

    use super::*;
    use crate::config::{ENV_API_URL, ENV_ORPHAN_POLICY, ENV_STEP_TIMEOUT};
    use crate::error::{ConfigError, Error, RemoteService};
    use crate::services::AccountId;

    struct Fixed {
        fail: bool,
    }

    #[async_trait]
    impl CredentialService for Fixed {
        async fn create(
            &self,
            _name: &str,
            _email: &str,
            _password: &SecretString,
        ) -> Result<AccountId, RemoteCallError> {
            if self.fail {
                Err(RemoteCallError::new(RemoteService::Credential, "boom"))
            } else {
                Ok(AccountId("acc-1".into()))
            }
        }
    }

    #[async_trait]
    impl SessionService for Fixed {
        async fn authenticate(
            &self,
            _email: &str,
            _password: &SecretString,
        ) -> Result<Session, RemoteCallError> {
            if self.fail {
                Err(RemoteCallError::new(RemoteService::Session, "boom"))
            } else {
                Ok(Session::new("tok", Utc::now()))
            }
        }
    }

    #[async_trait]
    impl ProfileService for Fixed {
        async fn fetch_current(&self, _session: &Session) -> Result<UserProfile, RemoteCallError> {
            if self.fail {
                Err(RemoteCallError::new(RemoteService::Profile, "boom"))
            } else {
                Ok(UserProfile {
                    id: "u-1".into(),
                    name: "Jane Doe".into(),
                    email: "jane@x.com".into(),
                    extra: Default::default(),
                })
            }
        }
    }

    /// Never resolves.
    struct Hanging;

    #[async_trait]
    impl CredentialService for Hanging {
        async fn create(
            &self,
            _name: &str,
            _email: &str,
            _password: &SecretString,
        ) -> Result<AccountId, RemoteCallError> {
            std::future::pending().await
        }
    }

    fn request() -> RegistrationRequest {
        RegistrationRequest::new("Jane Doe", "jane@x.com", "secret1")
    }

    fn orchestrator(
        create: Arc<dyn CredentialService>,
        others_fail: bool,
    ) -> OnboardingOrchestrator {
        let others = Arc::new(Fixed { fail: others_fail });
        OnboardingOrchestrator::new(create, others.clone(), others)
    }

    #[tokio::test]
    async fn success_walks_idle_inflight_succeeded() {
        let orch = orchestrator(Arc::new(Fixed { fail: false }), false);
        assert_eq!(orch.state(), SubmissionState::Idle);

        let outcome = orch.submit(request()).await;
        assert!(outcome.is_completed());
        assert_eq!(orch.state(), SubmissionState::Succeeded);

        let path: Vec<_> = orch.transitions().iter().map(|t| (t.from, t.to)).collect();
        assert_eq!(
            path,
            vec![
                (SubmissionState::Idle, SubmissionState::InFlight),
                (SubmissionState::InFlight, SubmissionState::Succeeded),
            ]
        );
        let record = orch.last_attempt().unwrap();
        assert_eq!(record.completed, WorkflowStep::ORDER.to_vec());
        assert!(record.finished_at.is_some());
    }

    #[tokio::test]
    async fn submit_after_success_is_ignored() {
        let orch = orchestrator(Arc::new(Fixed { fail: false }), false);
        orch.submit(request()).await;

        let again = orch.submit(request()).await;
        assert!(matches!(
            again,
            SubmitOutcome::Ignored {
                state: SubmissionState::Succeeded
            }
        ));
        assert_eq!(orch.transitions().len(), 2);
    }

    #[tokio::test]
    async fn failed_attempt_can_be_resubmitted() {
        let orch = orchestrator(Arc::new(Fixed { fail: true }), false);
        assert!(orch.submit(request()).await.is_failed());
        assert_eq!(orch.state(), SubmissionState::Failed);

        assert!(orch.submit(request()).await.is_failed());
        assert_eq!(orch.transitions().len(), 4);
    }

    #[tokio::test]
    async fn step_timeout_resolves_to_failed() {
        let orch = orchestrator(Arc::new(Hanging), false)
            .with_step_timeout(Duration::from_millis(20));
        let mut events = orch.subscribe();

        let outcome = orch.submit(request()).await;
        match outcome {
            SubmitOutcome::Failed {
                failed_at,
                completed,
                ..
            } => {
                assert_eq!(failed_at, WorkflowStep::CreateAccount);
                assert!(completed.is_empty());
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(orch.state(), SubmissionState::Failed);
        assert!(matches!(events.try_recv(), Ok(OnboardingEvent::Failed { .. })));
    }

    #[tokio::test]
    async fn dropped_submission_does_not_leave_inflight() {
        let orch = orchestrator(Arc::new(Hanging), false);
        let mut events = orch.subscribe();

        let abandoned =
            tokio::time::timeout(Duration::from_millis(20), orch.submit(request())).await;
        assert!(abandoned.is_err());

        assert_eq!(orch.state(), SubmissionState::Failed);
        let record = orch.last_attempt().unwrap();
        assert_eq!(record.failed_at, Some(WorkflowStep::CreateAccount));
        assert!(matches!(
            events.try_recv(),
            Ok(OnboardingEvent::Failed {
                kind: FailureKind::RegistrationFailed,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn orphan_policy_controls_failure_kind() {
        let concealed = orchestrator(Arc::new(Fixed { fail: false }), true);
        match concealed.submit(request()).await {
            SubmitOutcome::Failed { kind, failed_at, .. } => {
                assert_eq!(failed_at, WorkflowStep::Authenticate);
                assert_eq!(kind, FailureKind::RegistrationFailed);
            }
            other => panic!("expected failure, got {other:?}"),
        }

        let surfaced = orchestrator(Arc::new(Fixed { fail: false }), true)
            .with_orphan_policy(OrphanPolicy::Surface);
        match surfaced.submit(request()).await {
            SubmitOutcome::Failed { kind, .. } => {
                assert_eq!(kind, FailureKind::AccountCreatedWithoutSession);
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(surfaced.last_attempt().unwrap().is_partial_success());
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let event = OnboardingEvent::NavigateHome {
            user_id: "u-1".into(),
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            serde_json::json!({"type": "navigate_home", "user_id": "u-1"})
        );
    }

    #[test]
    fn from_lookup_requires_api_url() {
        let Err(err) = OnboardingOrchestrator::from_lookup(|_| None) else {
            panic!("expected a configuration error");
        };
        assert!(matches!(
            err,
            Error::Config(ConfigError::MissingEnvVar(ref key)) if key == ENV_API_URL
        ));
    }

    #[test]
    fn from_lookup_applies_settings() {
        let orch = OnboardingOrchestrator::from_lookup(|key| match key {
            ENV_API_URL => Some("http://api.local".into()),
            ENV_ORPHAN_POLICY => Some("surface".into()),
            ENV_STEP_TIMEOUT => Some("5".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(orch.orphan_policy(), OrphanPolicy::Surface);
        assert_eq!(orch.step_timeout, Duration::from_secs(5));
        assert_eq!(orch.state(), SubmissionState::Idle);
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    #[tokio::test]
    async fn logs_do_not_carry_the_email() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .finish();
        let _default = tracing::subscriber::set_default(subscriber);

        let orch = orchestrator(Arc::new(Fixed { fail: false }), false);
        assert!(orch.submit(request()).await.is_completed());

        let output = logs.contents();
        assert!(output.contains("Onboarding submission accepted"));
        assert!(!output.contains("jane@x.com"));
    }
}
