//! Configuration types.

use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Environment variable holding the API base URL.
pub const ENV_API_URL: &str = "SIGNUP_API_URL";
/// Per-request HTTP timeout, in seconds.
pub const ENV_REQUEST_TIMEOUT: &str = "SIGNUP_REQUEST_TIMEOUT_SECS";
/// Per-step orchestration timeout, in seconds.
pub const ENV_STEP_TIMEOUT: &str = "SIGNUP_STEP_TIMEOUT_SECS";
/// `conceal` or `surface`.
pub const ENV_ORPHAN_POLICY: &str = "SIGNUP_ORPHAN_POLICY";

/// What to tell the caller when the account was created but login failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrphanPolicy {
    /// Report the generic registration failure.
    #[default]
    Conceal,
    /// Report a distinguishable "account created without session" failure.
    Surface,
}

impl FromStr for OrphanPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "conceal" => Ok(Self::Conceal),
            "surface" => Ok(Self::Surface),
            other => Err(ConfigError::InvalidValue {
                key: ENV_ORPHAN_POLICY.to_string(),
                message: format!("expected `conceal` or `surface`, got `{other}`"),
            }),
        }
    }
}

/// Client configuration for the sign-up flow.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the account API, without trailing slash.
    pub api_base_url: String,
    /// Timeout applied by the transport to every HTTP request.
    pub request_timeout: Duration,
    /// Timeout applied by the orchestrator around each remote step.
    pub step_timeout: Duration,
    /// Reporting policy for orphaned accounts.
    pub orphan_policy: OrphanPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000".to_string(),
            request_timeout: Duration::from_secs(15),
            step_timeout: Duration::from_secs(30),
            orphan_policy: OrphanPolicy::Conceal,
        }
    }
}

impl ClientConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_base_url = lookup(ENV_API_URL)
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(ENV_API_URL.to_string()))?;

        let request_timeout = match lookup(ENV_REQUEST_TIMEOUT) {
            Some(raw) => parse_secs(ENV_REQUEST_TIMEOUT, &raw)?,
            None => defaults.request_timeout,
        };
        let step_timeout = match lookup(ENV_STEP_TIMEOUT) {
            Some(raw) => parse_secs(ENV_STEP_TIMEOUT, &raw)?,
            None => defaults.step_timeout,
        };
        let orphan_policy = match lookup(ENV_ORPHAN_POLICY) {
            Some(raw) => raw.parse()?,
            None => defaults.orphan_policy,
        };

        Ok(Self {
            api_base_url,
            request_timeout,
            step_timeout,
            orphan_policy,
        })
    }
}

fn parse_secs(key: &str, raw: &str) -> Result<Duration, ConfigError> {
    let secs: u64 = raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("{e}"),
    })?;
    if secs == 0 {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "must be greater than zero".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}
