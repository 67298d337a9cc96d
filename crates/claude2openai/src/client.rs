//! Upstream Claude Messages API client.

use crate::error::ProxyError;
use crate::types::{ErrorEnvelope, MessagesRequest, MessagesResponse};
use std::time::Duration;
use tracing::{debug, error};

#[derive(Debug, Clone)]
pub struct ClaudeClient {
    http: reqwest::Client,
    messages_url: String,
    anthropic_version: String,
}

impl ClaudeClient {
    pub fn new(
        base_url: &str,
        anthropic_version: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            messages_url: format!("{}/v1/messages", base_url.trim_end_matches('/')),
            anthropic_version: anthropic_version.into(),
        })
    }

    pub fn messages_url(&self) -> &str {
        &self.messages_url
    }

    /// POST the request and return the raw response once the upstream has
    /// answered with a success status.
    pub async fn send(
        &self,
        request: &MessagesRequest,
        api_key: &str,
    ) -> Result<reqwest::Response, ProxyError> {
        let body = serde_json::to_vec(request).map_err(ProxyError::Encode)?;

        debug!(url = %self.messages_url, model = %request.model, stream = request.stream, "calling Claude");
        let response = self
            .http
            .post(&self.messages_url)
            .header("content-type", "application/json")
            .header("x-api-key", api_key)
            .header("anthropic-version", &self.anthropic_version)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Claude request failed");
                ProxyError::Upstream(e)
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let bytes = response.bytes().await.map_err(ProxyError::ReadUpstream)?;
        error!(%status, body = %String::from_utf8_lossy(&bytes), "Claude error");
        match serde_json::from_slice::<ErrorEnvelope>(&bytes) {
            Ok(envelope) => Err(ProxyError::Claude {
                status: status.as_u16(),
                error: envelope.error,
            }),
            Err(_) => Err(ProxyError::UpstreamStatus {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            }),
        }
    }

    /// Non-streaming call: send and decode the whole response.
    pub async fn create_message(
        &self,
        request: &MessagesRequest,
        api_key: &str,
    ) -> Result<MessagesResponse, ProxyError> {
        let response = self.send(request, api_key).await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(ProxyError::ReadUpstream)?;

        // Some gateways answer errors with a 2xx status.
        if let Ok(envelope) = serde_json::from_slice::<ErrorEnvelope>(&bytes) {
            return Err(ProxyError::Claude {
                status,
                error: envelope.error,
            });
        }
        serde_json::from_slice(&bytes).map_err(ProxyError::ParseUpstream)
    }
}
