//! Remote completion gateway client
//!
//! All substantive intelligence lives behind a hosted chat-completion API;
//! this module is the thin client for it. The [`CompletionGateway`] trait
//! is the seam the proxy endpoints call through, so tests can stub the
//! network entirely.

mod error;
mod http;

pub use error::GatewayError;
pub use http::{HttpGateway, API_KEY_ENV};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// One completion round trip
///
/// `temperature`/`max_tokens` are optional; `/chat` forwards messages
/// verbatim with neither set, `/research` bounds both.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<usize>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Trait for the completion gateway
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    /// Send one chat completion request and return the assistant's text
    async fn complete(&self, request: CompletionRequest) -> Result<String, GatewayError>;
}
