use crate::api::{ChatReply, ChatRequest, ChatResponse, KeyIssueRequest, KeyIssueResponse};
use crate::core::config::Config;
use crate::core::error::TransportError;
use crate::utils::auth::add_bearer_auth;
use crate::utils::url::construct_api_url;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

const HEALTH_ENDPOINT: &str = "health";
const GENERATE_KEY_ENDPOINT: &str = "admin/v1/generate_key";
const COMPLETIONS_ENDPOINT: &str = "v1/chat/completions";

/// The backend calls the client core makes. Implemented over HTTP by
/// [`HttpTransport`]; tests substitute scripted fakes.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Lightweight authenticated request; `Ok` means the secret is valid.
    async fn probe(&self, master_secret: &str) -> Result<(), TransportError>;

    async fn issue_key(
        &self,
        master_secret: &str,
        request: &KeyIssueRequest,
    ) -> Result<KeyIssueResponse, TransportError>;

    async fn complete(
        &self,
        api_secret: &str,
        request: &ChatRequest,
    ) -> Result<ChatReply, TransportError>;
}

#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|err| TransportError::Network(err.to_string()))?;
        Ok(Self::new(client, config.base_url()))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn execute(
        &self,
        request: reqwest::RequestBuilder,
        endpoint: &str,
    ) -> Result<Vec<u8>, TransportError> {
        let response = request
            .send()
            .await
            .map_err(|err| TransportError::Network(err.to_string()))?;
        let status = response.status();
        debug!(endpoint, status = status.as_u16(), "backend responded");

        let body = response
            .bytes()
            .await
            .map_err(|err| TransportError::Network(err.to_string()))?;

        if !status.is_success() {
            let text = String::from_utf8_lossy(&body);
            return Err(TransportError::Status {
                status: status.as_u16(),
                detail: summarize_error_body(&text),
            });
        }
        Ok(body.to_vec())
    }
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, TransportError> {
    serde_json::from_slice(body).map_err(|err| TransportError::Malformed(err.to_string()))
}

#[async_trait]
impl Transport for HttpTransport {
    async fn probe(&self, master_secret: &str) -> Result<(), TransportError> {
        let url = construct_api_url(&self.base_url, HEALTH_ENDPOINT);
        let request = add_bearer_auth(self.client.get(url), master_secret);
        self.execute(request, HEALTH_ENDPOINT).await.map(|_| ())
    }

    async fn issue_key(
        &self,
        master_secret: &str,
        request: &KeyIssueRequest,
    ) -> Result<KeyIssueResponse, TransportError> {
        let url = construct_api_url(&self.base_url, GENERATE_KEY_ENDPOINT);
        let http_request = add_bearer_auth(self.client.post(url), master_secret).json(request);
        let body = self.execute(http_request, GENERATE_KEY_ENDPOINT).await?;
        parse_body(&body)
    }

    async fn complete(
        &self,
        api_secret: &str,
        request: &ChatRequest,
    ) -> Result<ChatReply, TransportError> {
        let url = construct_api_url(&self.base_url, COMPLETIONS_ENDPOINT);
        let http_request = add_bearer_auth(self.client.post(url), api_secret).json(request);
        let body = self.execute(http_request, COMPLETIONS_ENDPOINT).await?;
        parse_body::<ChatResponse>(&body)?
            .into_reply()
            .map_err(TransportError::Malformed)
    }
}

fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    let summary = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value
                .get("error")
                .and_then(|v| v.as_str().map(str::to_owned))
        })
        .or_else(|| {
            value.get("detail").and_then(|v| match v {
                serde_json::Value::String(s) => Some(s.to_string()),
                serde_json::Value::Null => None,
                other => Some(other.to_string()),
            })
        })
        .or_else(|| {
            value
                .get("message")
                .and_then(|v| v.as_str().map(str::to_owned))
        });

    summary.map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// One-line description of a non-2xx body.
fn summarize_error_body(error_text: &str) -> String {
    let trimmed = error_text.trim();

    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Ok(json_value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(summary) = extract_error_summary(&json_value) {
            if !summary.is_empty() {
                return summary;
            }
        }
    }

    trimmed.to_string()
}
