use anyhow::Context;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

use signup_flow::onboarding::{
    FailureKind, OnboardingEvent, OnboardingOrchestrator, RegistrationRequest, SubmitOutcome,
};
use signup_flow::validation::ValidationGateway;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let orchestrator = OnboardingOrchestrator::from_env().context("loading configuration")?;

    eprintln!("Signup Flow v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Orphaned accounts: {:?}", orchestrator.orphan_policy());
    eprintln!("   Development shell: the password is echoed as you type.");
    eprintln!("   Press Ctrl-D to quit.\n");

    let mut events = orchestrator.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let Some(request) = read_request(&mut lines).await? else {
            return Ok(());
        };

        let result = ValidationGateway::validate(&request);
        if !result.is_valid() {
            for (field, message) in result.inline_errors() {
                eprintln!("  {field}: {message}");
            }
            continue;
        }

        let outcome = orchestrator.submit(request).await;

        while let Ok(event) = events.try_recv() {
            if let OnboardingEvent::NavigateHome { user_id } = event {
                tracing::info!(%user_id, "Proceeding to home");
            }
        }

        match outcome {
            SubmitOutcome::Completed { profile, .. } => {
                println!("Welcome, {}", profile.name);
                return Ok(());
            }
            SubmitOutcome::Failed {
                kind: FailureKind::AccountCreatedWithoutSession,
                ..
            } => {
                eprintln!("Your account was created but we could not sign you in. Please log in.");
                return Ok(());
            }
            SubmitOutcome::Failed { .. } => {
                eprintln!("Registration failed, please try again.\n");
            }
            SubmitOutcome::Ignored { state } => {
                eprintln!("Submission ignored ({state}).");
            }
        }
    }
}

/// Prompt for the three fields. `None` on end of input.
///
/// Development harness only: the password is read as a plain line and the
/// terminal echoes it. A real front end masks the field.
async fn read_request<R>(lines: &mut Lines<R>) -> anyhow::Result<Option<RegistrationRequest>>
where
    R: AsyncBufRead + Unpin,
{
    let mut fields = Vec::with_capacity(3);
    for prompt in ["Your name", "Email", "Password"] {
        eprint!("{prompt}: ");
        match lines.next_line().await.context("reading stdin")? {
            Some(line) => fields.push(line),
            None => return Ok(None),
        }
    }
    let [name, email, password]: [String; 3] = fields
        .try_into()
        .map_err(|_| anyhow::anyhow!("expected three fields"))?;
    Ok(Some(RegistrationRequest::new(name, email, password)))
}
