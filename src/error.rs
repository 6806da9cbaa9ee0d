//! Error types for the sign-up flow.

use std::time::Duration;

/// Top-level error type for the crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Remote call error: {0}")]
    RemoteCall(#[from] RemoteCallError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Failures of the opaque request function.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Failed to build request for {path}: {reason}")]
    InvalidRequest { path: String, reason: String },

    #[error("Request to {path} failed: {reason}")]
    RequestFailed { path: String, reason: String },

    #[error("Request to {path} timed out after {timeout:?}")]
    Timeout { path: String, timeout: Duration },

    #[error("Request to {path} returned HTTP {status}: {body}")]
    Status {
        path: String,
        status: u16,
        body: String,
    },

    #[error("Invalid response body from {path}: {reason}")]
    InvalidBody { path: String, reason: String },
}

/// Which remote contract produced a [`RemoteCallError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteService {
    Credential,
    Session,
    Profile,
}

impl std::fmt::Display for RemoteService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Credential => "credential",
            Self::Session => "session",
            Self::Profile => "profile",
        };
        write!(f, "{s}")
    }
}

/// Any failure from the credential, session or profile service.
///
/// The orchestrator never branches on `reason`; it is kept for logs only.
#[derive(Debug, thiserror::Error)]
#[error("{service} service call failed: {reason}")]
pub struct RemoteCallError {
    pub service: RemoteService,
    pub reason: String,
}

impl RemoteCallError {
    pub fn new(service: RemoteService, reason: impl Into<String>) -> Self {
        Self {
            service,
            reason: reason.into(),
        }
    }

    /// Wrap a transport failure as a failure of `service`.
    pub fn from_transport(service: RemoteService, err: TransportError) -> Self {
        Self::new(service, err.to_string())
    }
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_call_error_mentions_service() {
        let err = RemoteCallError::from_transport(
            RemoteService::Session,
            TransportError::Status {
                path: "/auth/login".into(),
                status: 401,
                body: "bad credentials".into(),
            },
        );
        let msg = err.to_string();
        assert!(msg.starts_with("session service call failed"));
        assert!(msg.contains("401"));
    }

    #[test]
    fn top_level_wraps_config_error() {
        let err: Error = ConfigError::MissingEnvVar("SIGNUP_API_URL".into()).into();
        assert_eq!(
            err.to_string(),
            "Configuration error: Missing required environment variable: SIGNUP_API_URL"
        );
    }
}
