//! HTTP transport over `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use secrecy::ExposeSecret;

use super::{ApiRequest, ApiResponse, Method, Transport};
use crate::config::ClientConfig;
use crate::error::TransportError;

/// JSON-over-HTTP transport rooted at a base URL.
pub struct ReqwestTransport {
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.api_base_url.clone(), config.request_timeout)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let path = request.path;
        let url = self.url(&path);

        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        }
        .timeout(self.timeout)
        .header(CONTENT_TYPE, "application/json")
        .header(ACCEPT, "application/json");

        if let Some(token) = request.bearer.as_ref() {
            builder = builder.bearer_auth(token.expose_secret());
        }
        if let Some(body) = request.body.as_ref() {
            builder = builder.json(body);
        }

        tracing::debug!(method = %request.method, %path, "Sending API request");

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout {
                    path: path.clone(),
                    timeout: self.timeout,
                }
            } else if e.is_builder() {
                TransportError::InvalidRequest {
                    path: path.clone(),
                    reason: e.to_string(),
                }
            } else {
                TransportError::RequestFailed {
                    path: path.clone(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::RequestFailed {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        if !status.is_success() {
            tracing::debug!(%path, status = status.as_u16(), "API request rejected");
            return Err(TransportError::Status {
                path,
                status: status.as_u16(),
                body: text,
            });
        }

        let body = if text.trim().is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&text).map_err(|e| TransportError::InvalidBody {
                path: path.clone(),
                reason: e.to_string(),
            })?
        };

        Ok(ApiResponse {
            status: status.as_u16(),
            body,
        })
    }
}
