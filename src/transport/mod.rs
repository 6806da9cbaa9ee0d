//! Transport abstraction: the opaque request function the services use.
//!
//! Services describe a call as an [`ApiRequest`]; a [`Transport`] turns it
//! into bytes on the wire. The only authentication mechanism is the optional
//! bearer token on the request.

mod reqwest_transport;

pub use reqwest_transport::ReqwestTransport;

use async_trait::async_trait;
use secrecy::SecretString;
use serde::de::DeserializeOwned;

use crate::error::TransportError;

/// HTTP verbs used by the account API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
        }
    }
}

/// A transport-agnostic API call.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base, starting with `/`.
    pub path: String,
    /// Bearer credential; `None` for unauthenticated calls.
    pub bearer: Option<SecretString>,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            bearer: None,
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            bearer: None,
            body: Some(body),
        }
    }

    /// Attach a bearer token.
    pub fn with_bearer(mut self, token: SecretString) -> Self {
        self.bearer = Some(token);
        self
    }
}

/// A successful (2xx) response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    /// Parsed JSON body; `Null` when the body was empty.
    pub body: serde_json::Value,
}

impl ApiResponse {
    /// Deserialize the body into `T`.
    pub fn json<T: DeserializeOwned>(self, path: &str) -> Result<T, TransportError> {
        serde_json::from_value(self.body).map_err(|e| TransportError::InvalidBody {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Sends [`ApiRequest`]s. Non-2xx responses are errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Created {
        id: String,
    }

    #[test]
    fn builders_set_method_and_auth() {
        let get = ApiRequest::get("/users/me").with_bearer(SecretString::from("t0k"));
        assert_eq!(get.method, Method::Get);
        assert!(get.body.is_none());
        assert_eq!(get.bearer.as_ref().unwrap().expose_secret(), "t0k");

        let post = ApiRequest::post("/users", serde_json::json!({"name": "Jane"}));
        assert_eq!(post.method, Method::Post);
        assert!(post.bearer.is_none());
        assert_eq!(post.body.unwrap()["name"], "Jane");
    }

    #[test]
    fn response_json_decodes_or_reports_path() {
        let ok = ApiResponse {
            status: 201,
            body: serde_json::json!({"id": "u-1"}),
        };
        let created: Created = ok.json("/users").unwrap();
        assert_eq!(created.id, "u-1");

        let bad = ApiResponse {
            status: 200,
            body: serde_json::json!({"unexpected": true}),
        };
        let err = bad.json::<Created>("/users").unwrap_err();
        assert!(matches!(err, TransportError::InvalidBody { ref path, .. } if path == "/users"));
    }
}
