//! LLM Provider implementations

pub mod chat;
pub mod cohere;
pub mod gemini;
mod http;
pub mod sentinel;
pub mod traits;

pub use chat::ChatCompletionsClient;
pub use cohere::CohereClient;
pub use gemini::GeminiClient;
pub use sentinel::{is_rate_limit_signal, is_sentinel, sentinel, SENTINEL_PREFIX};
pub use traits::{
    CompletionRequest, CompletionResponse, GenerationParams, LLMProvider, Message, ProviderError,
    ProviderResult,
};

use crate::config::{ApiKind, Config, GenerationConfig, ProviderConfig};
use std::sync::Arc;

impl From<&GenerationConfig> for GenerationParams {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// Build one adapter from its roster entry
pub fn build_provider(
    name: &str,
    config: &ProviderConfig,
    params: GenerationParams,
) -> ProviderResult<Arc<dyn LLMProvider>> {
    let provider: Arc<dyn LLMProvider> = match config.kind {
        ApiKind::ChatCompletions => {
            Arc::new(ChatCompletionsClient::from_config(name, config)?.with_params(params))
        }
        ApiKind::Cohere => Arc::new(CohereClient::from_config(name, config)?.with_params(params)),
        ApiKind::Gemini => Arc::new(GeminiClient::from_config(name, config)?.with_params(params)),
    };
    Ok(provider)
}

/// Create every enabled provider whose credential is present.
///
/// Providers without a key are skipped with a warning, so a partial
/// `.env` still yields a usable roster.
pub fn create_providers(config: &Config) -> Vec<Arc<dyn LLMProvider>> {
    let params = GenerationParams::from(&config.generation);
    let mut providers = Vec::new();

    for (name, provider_config) in config.enabled_providers() {
        match build_provider(name, provider_config, params) {
            Ok(provider) => providers.push(provider),
            Err(e) => tracing::warn!("Skipping provider {}: {}", name, e),
        }
    }

    providers
}

/// Create specific providers by roster key, failing on unknown or keyless names
pub fn create_providers_named(names: &[&str], config: &Config) -> ProviderResult<Vec<Arc<dyn LLMProvider>>> {
    let params = GenerationParams::from(&config.generation);
    let mut providers = Vec::new();

    for name in names {
        let key = name.to_lowercase();
        let provider_config = config
            .get_provider(&key)
            .ok_or_else(|| ProviderError::Config(format!("Unknown provider: {}", name)))?;
        providers.push(build_provider(&key, provider_config, params)?);
    }

    Ok(providers)
}
