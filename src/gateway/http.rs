//! HTTP client for the hosted completion gateway
//!
//! Speaks the OpenAI-compatible chat completions format. The credential is
//! only ever sent to the configured endpoint. No request timeout is set:
//! a hung gateway call stays in flight until the transport gives up.

use super::{ChatMessage, CompletionGateway, CompletionRequest, GatewayError};
use crate::config::GatewayConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::env;

/// Environment variable holding the server-side gateway credential
pub const API_KEY_ENV: &str = "AGNI_GATEWAY_API_KEY";

pub struct HttpGateway {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl HttpGateway {
    /// Build a gateway client from config, reading the credential from the
    /// environment. Fails when the credential is absent.
    pub fn from_env(config: &GatewayConfig) -> Result<Self> {
        let api_key = env::var(API_KEY_ENV)
            .with_context(|| format!("{} environment variable not set", API_KEY_ENV))?;

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
        })
    }
}

#[derive(Debug, Serialize)]
struct CompletionWireRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct CompletionWireResponse {
    choices: Vec<WireChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    content: Option<String>,
}

#[async_trait]
impl CompletionGateway for HttpGateway {
    async fn complete(&self, request: CompletionRequest) -> Result<String, GatewayError> {
        let body = CompletionWireRequest {
            model: &self.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(GatewayError::from_network_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Gateway error ({}): {}", status, error_text);
            return Err(GatewayError::from_http_status(status, error_text));
        }

        let parsed: CompletionWireResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Malformed(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GatewayError::Malformed("response contained no choices".to_string()))
    }
}
