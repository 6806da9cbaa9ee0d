//! REST binding of the account services.
//!
//! | Call | Request | Auth |
//! |---|---|---|
//! | create account | `POST /users` `{name, email, password}` | none |
//! | authenticate | `POST /auth/login` `{email, password}` | none |
//! | fetch profile | `GET /users/me` | bearer |

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::{AccountId, CredentialService, ProfileService, Session, SessionService, UserProfile};
use crate::error::{RemoteCallError, RemoteService, TransportError};
use crate::transport::{ApiRequest, Transport};

pub const USERS_PATH: &str = "/users";
pub const LOGIN_PATH: &str = "/auth/login";
pub const CURRENT_USER_PATH: &str = "/users/me";

#[derive(Debug, Deserialize)]
struct CreatedAccount {
    #[serde(alias = "_id")]
    id: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(alias = "access_token")]
    token: String,
    #[serde(default)]
    issued_at: Option<DateTime<Utc>>,
}

/// All three account services over one [`Transport`].
pub struct RestAccountApi {
    transport: Arc<dyn Transport>,
}

impl RestAccountApi {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

fn account_id(value: serde_json::Value) -> Result<AccountId, TransportError> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Ok(AccountId(s)),
        serde_json::Value::Number(n) => Ok(AccountId(n.to_string())),
        other => Err(TransportError::InvalidBody {
            path: USERS_PATH.to_string(),
            reason: format!("unusable account id: {other}"),
        }),
    }
}

#[async_trait]
impl CredentialService for RestAccountApi {
    async fn create(
        &self,
        name: &str,
        email: &str,
        password: &SecretString,
    ) -> Result<AccountId, RemoteCallError> {
        let body = serde_json::json!({
            "name": name,
            "email": email,
            "password": password.expose_secret(),
        });
        let wrap = |e| RemoteCallError::from_transport(RemoteService::Credential, e);

        let response = self
            .transport
            .send(ApiRequest::post(USERS_PATH, body))
            .await
            .map_err(wrap)?;
        let created: CreatedAccount = response.json(USERS_PATH).map_err(wrap)?;
        account_id(created.id).map_err(wrap)
    }
}

#[async_trait]
impl SessionService for RestAccountApi {
    async fn authenticate(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Session, RemoteCallError> {
        let body = serde_json::json!({
            "email": email,
            "password": password.expose_secret(),
        });
        let wrap = |e| RemoteCallError::from_transport(RemoteService::Session, e);

        let response = self
            .transport
            .send(ApiRequest::post(LOGIN_PATH, body))
            .await
            .map_err(wrap)?;
        let login: LoginResponse = response.json(LOGIN_PATH).map_err(wrap)?;
        if login.token.is_empty() {
            return Err(RemoteCallError::new(
                RemoteService::Session,
                "login response carried an empty token",
            ));
        }

        Ok(Session::new(
            login.token,
            login.issued_at.unwrap_or_else(Utc::now),
        ))
    }
}

#[async_trait]
impl ProfileService for RestAccountApi {
    async fn fetch_current(&self, session: &Session) -> Result<UserProfile, RemoteCallError> {
        let wrap = |e| RemoteCallError::from_transport(RemoteService::Profile, e);

        let request = ApiRequest::get(CURRENT_USER_PATH).with_bearer(session.token.clone());
        let response = self.transport.send(request).await.map_err(wrap)?;
        response.json(CURRENT_USER_PATH).map_err(wrap)
    }
}
