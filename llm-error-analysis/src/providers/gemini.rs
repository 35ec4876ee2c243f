//! Google Gemini `generateContent` client

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

/// Gemini API client
pub struct GeminiClient {
    name: String,
    display_name: String,
    api_key: String,
    /// Models base URL; the request goes to `{base_url}/{model}:generateContent`
    base_url: String,
    model: String,
    http_client: Client,
    params: GenerationParams,
}

impl GeminiClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            name: "gemini".to_string(),
            display_name: "Gemini".to_string(),
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: model.into(),
            http_client: Client::new(),
            params: GenerationParams::default(),
        }
    }

    pub fn from_config(name: &str, config: &ProviderConfig) -> ProviderResult<Self> {
        let api_key = api_key_from_env(&config.api_key_env)?;
        let mut client = Self::new(&config.endpoint, &config.model, api_key);
        client.name = name.to_string();
        client.display_name = config.display_name.clone();
        Ok(client)
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    fn url(&self) -> String {
        format!("{}/{}:generateContent", self.base_url.trim_end_matches('/'), self.model)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

fn build_body(request: &CompletionRequest) -> GeminiRequest {
    let contents = request
        .messages
        .iter()
        .map(|m| Content {
            role: Some(if m.role == "assistant" { "model".to_string() } else { "user".to_string() }),
            parts: vec![Part {
                text: Some(m.content.clone()),
            }],
        })
        .collect();

    GeminiRequest {
        contents,
        generation_config: GenerationConfig {
            temperature: request.temperature,
            max_output_tokens: request.max_tokens,
        },
    }
}

fn extract_text(response: GeminiResponse) -> ProviderResult<(String, Option<String>)> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Parse("No candidates in response".to_string()))?;

    let text = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<Vec<_>>().join(""))
        .unwrap_or_default();

    if text.is_empty() {
        return Err(ProviderError::Parse("Candidate has no text parts".to_string()));
    }
    Ok((text, candidate.finish_reason))
}

#[async_trait]
impl LLMProvider for GeminiClient {
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
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&build_body(request))
            .send()
            .await?;

        let response = check_status(&self.name, response).await?;
        let api_response: GeminiResponse = decode_json(&self.name, response).await?;
        let (content, finish_reason) = extract_text(api_response)?;

        Ok(CompletionResponse {
            content,
            model: self.model.clone(),
            finish_reason: finish_reason.unwrap_or_else(|| "unknown".to_string()),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::http::test_server::respond_once;

    #[test]
    fn test_request_envelope() {
        let request = CompletionRequest::for_prompt("hello", &GenerationParams::default());
        let body = serde_json::to_value(build_body(&request)).unwrap();

        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 2048);
    }

    #[test]
    fn test_extract_joins_parts() {
        let response: GeminiResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"a"},{"text":"b"}]},"finishReason":"STOP"}]}"#,
        )
        .unwrap();
        let (text, finish) = extract_text(response).unwrap();
        assert_eq!(text, "ab");
        assert_eq!(finish.as_deref(), Some("STOP"));
    }

    #[test]
    fn test_url() {
        let client = GeminiClient::new("https://example.test/v1beta/models/", "gemini-1.5-flash", "k");
        assert_eq!(client.url(), "https://example.test/v1beta/models/gemini-1.5-flash:generateContent");
    }

    #[tokio::test]
    async fn test_generate_content_against_local_server() {
        let (base, request) = respond_once(
            "200 OK",
            &[],
            r#"{"candidates":[{"content":{"parts":[{"text":"Kök neden: "},{"text":"DNS"}]},"finishReason":"STOP"}]}"#,
        )
        .await;
        let client = GeminiClient::new(format!("{}/v1beta/models", base), "gemini-1.5-flash", "g-key");

        assert_eq!(client.analyze("neden?").await, "Kök neden: DNS");

        let raw = request.await.unwrap();
        assert!(raw.starts_with("POST /v1beta/models/gemini-1.5-flash:generateContent"));
        assert!(raw.to_lowercase().contains("x-goog-api-key: g-key"));
        assert!(raw.contains("maxOutputTokens"));
    }
}
