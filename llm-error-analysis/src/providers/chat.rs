//! OpenAI-compatible chat completions client (Groq, Mistral, OpenRouter)

use async_trait::async_trait;
use indexmap::IndexMap;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::http::{api_key_from_env, check_status, decode_json};
use super::traits::{
    CompletionRequest, CompletionResponse, GenerationParams, LLMProvider, Message, ProviderError,
    ProviderResult,
};
use crate::config::ProviderConfig;

/// Client for any endpoint speaking the `/chat/completions` envelope
pub struct ChatCompletionsClient {
    name: String,
    display_name: String,
    api_key: String,
    endpoint: String,
    model: String,
    headers: IndexMap<String, String>,
    http_client: Client,
    params: GenerationParams,
}

impl ChatCompletionsClient {
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            model: model.into(),
            headers: IndexMap::new(),
            http_client: Client::new(),
            params: GenerationParams::default(),
        }
    }

    /// Build from a roster entry, reading the key from the environment
    pub fn from_config(name: &str, config: &ProviderConfig) -> ProviderResult<Self> {
        let api_key = api_key_from_env(&config.api_key_env)?;
        Ok(Self::new(name, &config.endpoint, &config.model, api_key)
            .with_display_name(&config.display_name)
            .with_headers(config.headers.clone()))
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    /// Extra headers sent with every request
    pub fn with_headers(mut self, headers: IndexMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

fn build_body<'a>(model: &'a str, request: &'a CompletionRequest) -> ChatRequest<'a> {
    ChatRequest {
        model,
        messages: &request.messages,
        temperature: request.temperature,
        max_tokens: request.max_tokens,
    }
}

fn extract_text(response: ChatResponse) -> ProviderResult<(String, Option<String>, Option<String>)> {
    let model = response.model;
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Parse("No choices in response".to_string()))?;
    let content = choice
        .message
        .content
        .ok_or_else(|| ProviderError::Parse("Choice has no message content".to_string()))?;
    Ok((content, model, choice.finish_reason))
}

#[async_trait]
impl LLMProvider for ChatCompletionsClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn params(&self) -> GenerationParams {
        self.params
    }

    async fn complete(&self, request: &CompletionRequest) -> ProviderResult<CompletionResponse> {
        let start = Instant::now();

        let mut builder = self
            .http_client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json");
        for (key, value) in &self.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }

        let response = builder.json(&build_body(&self.model, request)).send().await?;
        let response = check_status(&self.name, response).await?;
        let api_response: ChatResponse = decode_json(&self.name, response).await?;
        let (content, model, finish_reason) = extract_text(api_response)?;

        Ok(CompletionResponse {
            content,
            model: model.unwrap_or_else(|| self.model.clone()),
            finish_reason: finish_reason.unwrap_or_else(|| "unknown".to_string()),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}
