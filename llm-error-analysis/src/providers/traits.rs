//! Provider trait definitions for LLM API clients

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::sentinel;

/// A message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Request for a completion from an LLM provider
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(messages: Vec<Message>, max_tokens: u32, temperature: f32) -> Self {
        Self {
            messages,
            max_tokens,
            temperature,
        }
    }

    /// Single user turn carrying the prompt
    pub fn for_prompt(prompt: &str, params: &GenerationParams) -> Self {
        Self::new(vec![Message::user(prompt)], params.max_tokens, params.temperature)
    }

    /// Concatenated user content, for single-message envelopes
    pub fn user_text(&self) -> String {
        self.messages
            .iter()
            .filter(|m| m.role == "user")
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Generation parameters fixed for every call in a run
#[derive(Debug, Clone, Copy)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 2048,
        }
    }
}

/// Response from an LLM provider
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
    pub model: String,
    pub finish_reason: String,
    pub latency_ms: u64,
}

/// Error types for provider operations
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Request failed with status code 429 (rate limit): retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("Timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Trait for LLM providers
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Column key of the provider (e.g. "groq", "openrouter_hermes")
    fn name(&self) -> &str;

    /// Human-readable label for console output
    fn display_name(&self) -> &str;

    /// Model identifier sent with each request
    fn model(&self) -> &str;

    /// Generation parameters applied by `analyze`
    fn params(&self) -> GenerationParams {
        GenerationParams::default()
    }

    /// Send a completion request
    async fn complete(&self, request: &CompletionRequest) -> ProviderResult<CompletionResponse>;

    /// Analyze a prompt, never failing.
    ///
    /// Any provider error is logged and returned as sentinel text
    /// (`"Error: ..."`) so one vendor outage cannot abort a fan-out.
    async fn analyze(&self, prompt: &str) -> String {
        tracing::info!("{} analyzing...", self.display_name());
        let request = CompletionRequest::for_prompt(prompt, &self.params());

        match self.complete(&request).await {
            Ok(response) => {
                tracing::info!(
                    "{} analysis completed ({}ms, finish: {})",
                    self.display_name(),
                    response.latency_ms,
                    response.finish_reason
                );
                response.content
            }
            Err(e) => {
                tracing::error!("{} error: {}", self.display_name(), e);
                sentinel::sentinel(&e)
            }
        }
    }
}
