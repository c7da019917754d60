//! External text-generation providers
//!
//! A provider turns a prompt into free-form text. The HTTP implementation
//! speaks the common chat-completion shape and classifies failures so the
//! orchestrator can decide between retry, cooldown and moving on.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const TEMPERATURE: f32 = 0.1;
const STOP_SEQUENCES: &[&str] = &["\n\n"];

/// Provider failures
#[derive(Debug, Error)]
pub enum ProviderError {
    /// 401/403: key rejected, provider is skipped for the rest of the run
    #[error("Authentication failed ({0})")]
    Auth(u16),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Server error {0}")]
    Server(u16),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    /// Empty reply, no valid code, or a code that is already issued
    #[error("Parse error: {0}")]
    Parse(String),
}

impl ProviderError {
    /// Whether backoff retries apply
    pub fn is_rate_limit(&self) -> bool {
        match self {
            ProviderError::RateLimit(_) => true,
            ProviderError::Network(message) | ProviderError::Api(_, message) => {
                mentions_rate_limit(message)
            }
            _ => false,
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, ProviderError::Auth(_))
    }
}

fn mentions_rate_limit(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("rate limit") || lower.contains("too many requests")
}

/// Static description of a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSpec {
    pub name: String,
    pub id: String,
    pub model: String,
    pub endpoint: String,
    #[serde(skip_serializing, default)]
    pub api_key: String,
    pub requests_per_minute: u32,
    /// Lower runs first
    pub priority: u32,
    pub max_tokens: u32,
}

/// Text returned by a provider
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderReply {
    pub content: String,
    pub reasoning: Option<String>,
    pub finish_reason: Option<String>,
}

impl ProviderReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            reasoning: None,
            finish_reason: Some("stop".to_string()),
        }
    }

    /// Text to extract a code from
    ///
    /// Falls back to the reasoning field when content is blank.
    pub fn extraction_text(&self) -> Option<&str> {
        if !self.content.trim().is_empty() {
            return Some(&self.content);
        }
        self.reasoning.as_deref().filter(|r| !r.trim().is_empty())
    }

    /// Output was cut off by the token limit
    pub fn truncated(&self) -> bool {
        self.finish_reason.as_deref() == Some("length")
    }
}

/// A code-generating provider
#[async_trait]
pub trait CodeProvider: Send + Sync {
    fn spec(&self) -> &ProviderSpec;

    async fn complete(&self, prompt: &str) -> Result<ProviderReply, ProviderError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
    stop: &'a [&'a str],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReplyMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatReplyMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    reasoning: Option<String>,
}

/// Chat-completion provider over HTTP
pub struct HttpChatProvider {
    spec: ProviderSpec,
    http_client: reqwest::Client,
}

impl HttpChatProvider {
    pub fn new(spec: ProviderSpec) -> Result<Self, ProviderError> {
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(Self { spec, http_client })
    }
}

#[async_trait]
impl CodeProvider for HttpChatProvider {
    fn spec(&self) -> &ProviderSpec {
        &self.spec
    }

    async fn complete(&self, prompt: &str) -> Result<ProviderReply, ProviderError> {
        let body = ChatRequest {
            model: &self.spec.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            max_tokens: self.spec.max_tokens,
            temperature: TEMPERATURE,
            stream: false,
            stop: STOP_SEQUENCES,
        };

        tracing::debug!(provider = %self.spec.id, model = %self.spec.model, "Calling provider");

        let response = self
            .http_client
            .post(&self.spec.endpoint)
            .bearer_auth(&self.spec.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        match status {
            401 | 403 => return Err(ProviderError::Auth(status)),
            429 => {
                let text = response.text().await.unwrap_or_default();
                return Err(ProviderError::RateLimit(text));
            }
            500..=599 => return Err(ProviderError::Server(status)),
            200..=299 => {}
            _ => {
                let text = response.text().await.unwrap_or_default();
                return Err(ProviderError::Api(status, text));
            }
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Parse("response has no choices".to_string()))?;

        Ok(ProviderReply {
            content: choice.message.content.unwrap_or_default(),
            reasoning: choice.message.reasoning,
            finish_reason: choice.finish_reason,
        })
    }
}
