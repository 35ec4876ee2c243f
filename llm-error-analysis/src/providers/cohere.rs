//! Cohere chat API client (single-message envelope)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::http::{api_key_from_env, check_status, decode_json};
use super::traits::{
    CompletionRequest, CompletionResponse, GenerationParams, LLMProvider, ProviderError,
    ProviderResult,
};
use crate::config::ProviderConfig;

const DEFAULT_ENDPOINT: &str = "https://api.cohere.ai/v1/chat";
const DEFAULT_MODEL: &str = "command-nightly";

/// Cohere API client
pub struct CohereClient {
    name: String,
    display_name: String,
    api_key: String,
    endpoint: String,
    model: String,
    http_client: Client,
    params: GenerationParams,
}

impl CohereClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            name: "cohere".to_string(),
            display_name: "Cohere".to_string(),
            api_key: api_key.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            http_client: Client::new(),
            params: GenerationParams::default(),
        }
    }

    /// Build from a roster entry, reading the key from the environment
    pub fn from_config(name: &str, config: &ProviderConfig) -> ProviderResult<Self> {
        let api_key = api_key_from_env(&config.api_key_env)?;
        Ok(Self::new(api_key)
            .with_name(name)
            .with_display_name(&config.display_name)
            .with_endpoint(&config.endpoint)
            .with_model(&config.model))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    /// Set custom endpoint URL
    pub fn with_endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }
}

#[derive(Serialize)]
struct CohereRequest {
    model: String,
    message: String,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CohereResponse {
    text: Option<String>,
    finish_reason: Option<String>,
}

fn build_body(model: &str, request: &CompletionRequest) -> CohereRequest {
    CohereRequest {
        model: model.to_string(),
        message: request.user_text(),
        temperature: request.temperature,
        max_tokens: request.max_tokens,
    }
}

#[async_trait]
impl LLMProvider for CohereClient {
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

        let response = self
            .http_client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&build_body(&self.model, request))
            .send()
            .await?;

        let response = check_status(&self.name, response).await?;
        let api_response: CohereResponse = decode_json(&self.name, response).await?;
        let content = api_response
            .text
            .ok_or_else(|| ProviderError::Parse("Response has no text field".to_string()))?;

        Ok(CompletionResponse {
            content,
            model: self.model.clone(),
            finish_reason: api_response.finish_reason.unwrap_or_else(|| "unknown".to_string()),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::http::test_server::respond_once;

    #[test]
    fn test_request_envelope_uses_message_field() {
        let request = CompletionRequest::for_prompt("analyze this", &GenerationParams::default());
        let body = serde_json::to_value(build_body("command-nightly", &request)).unwrap();

        assert_eq!(body["model"], "command-nightly");
        assert_eq!(body["message"], "analyze this");
        assert!(body.get("messages").is_none());
        assert_eq!(body["max_tokens"], 2048);
    }

    #[tokio::test]
    async fn test_chat_against_local_server() {
        let (base, request) = respond_once("200 OK", &[], r#"{"text":"Önbelleği temizle","generation_id":"g1"}"#).await;
        let client = CohereClient::new("co-key").with_endpoint(format!("{}/v1/chat", base));

        assert_eq!(client.analyze("neden?").await, "Önbelleği temizle");

        let raw = request.await.unwrap();
        assert!(raw.starts_with("POST /v1/chat"));
        assert!(raw.contains("Bearer co-key"));
        assert!(raw.contains(r#""message":"neden?""#));
    }
}
