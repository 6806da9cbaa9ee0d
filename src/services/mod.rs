//! Remote service contracts used by the onboarding workflow.
//!
//! Each contract is a narrow async trait. Failures are opaque
//! [`RemoteCallError`]s; callers do not branch on the cause.

pub mod rest;

pub use rest::RestAccountApi;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::RemoteCallError;

/// Server-side identifier of a newly created account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub String);

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Credential proving an authenticated identity.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: SecretString,
    pub issued_at: DateTime<Utc>,
}

impl Session {
    pub fn new(token: impl Into<String>, issued_at: DateTime<Utc>) -> Self {
        Self {
            token: SecretString::from(token.into()),
            issued_at,
        }
    }

    /// `Authorization` header value for authenticated calls.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token.expose_secret())
    }
}

/// Profile of the signed-in user. Unknown keys are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Creates accounts.
#[async_trait]
pub trait CredentialService: Send + Sync {
    async fn create(
        &self,
        name: &str,
        email: &str,
        password: &SecretString,
    ) -> Result<AccountId, RemoteCallError>;
}

/// Exchanges credentials for a [`Session`].
#[async_trait]
pub trait SessionService: Send + Sync {
    async fn authenticate(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Session, RemoteCallError>;
}

/// Reads the current user's profile. Every call carries the session token.
#[async_trait]
pub trait ProfileService: Send + Sync {
    async fn fetch_current(&self, session: &Session) -> Result<UserProfile, RemoteCallError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_renders_token() {
        let session = Session::new("abc.def", Utc::now());
        assert_eq!(session.bearer(), "Bearer abc.def");
        assert!(!format!("{session:?}").contains("abc.def"));
    }

    #[test]
    fn profile_accepts_underscore_id_and_keeps_extra_keys() {
        let profile: UserProfile = serde_json::from_value(serde_json::json!({
            "_id": "42",
            "name": "Jane Doe",
            "email": "jane@x.com",
            "avatar": "https://img/jane.png"
        }))
        .unwrap();
        assert_eq!(profile.id, "42");
        assert_eq!(profile.name, "Jane Doe");
        assert_eq!(profile.extra["avatar"], "https://img/jane.png");
    }
}
