//! Shared HTTP plumbing for the adapters

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

use super::traits::{ProviderError, ProviderResult};

const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Read an API key from the environment
pub(crate) fn api_key_from_env(var: &str) -> ProviderResult<String> {
    std::env::var(var)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| ProviderError::Config(format!("{} not set", var)))
}

/// Map non-success statuses to provider errors, logging the body
pub(crate) async fn check_status(provider: &str, response: Response) -> ProviderResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
            * 1000;
        let body = response.text().await.unwrap_or_default();
        tracing::debug!("{} rate limited, response data: {}", provider, body);
        return Err(ProviderError::RateLimited {
            retry_after_ms: retry_after,
        });
    }

    let body = response.text().await.unwrap_or_default();
    tracing::error!("{} response data: {}", provider, body);
    Err(ProviderError::Api {
        status: status.as_u16(),
        message: extract_error_message(&body)
            .unwrap_or_else(|| format!("Request failed with status code {}", status.as_u16())),
    })
}

/// Decode a JSON body, reporting malformed payloads as parse errors
pub(crate) async fn decode_json<T: DeserializeOwned>(provider: &str, response: Response) -> ProviderResult<T> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| {
        tracing::debug!("{} undecodable body: {}", provider, body);
        ProviderError::Parse(format!("{}: {}", provider, e))
    })
}

/// Pull a human-readable message out of the common vendor error shapes:
/// `{"error": {"message": ..}}`, `{"error": ".."}` and `{"message": ..}`.
fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let message = match value.get("error") {
        Some(serde_json::Value::Object(obj)) => obj.get("message").and_then(|m| m.as_str()),
        Some(serde_json::Value::String(s)) => Some(s.as_str()),
        _ => value.get("message").and_then(|m| m.as_str()),
    };
    message.map(str::to_string)
}
