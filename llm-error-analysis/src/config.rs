//! Configuration management for the error analysis pipeline
//!
//! Loads the provider roster, generation parameters, batch pacing, the
//! database location and scoring weights from TOML files and provides runtime access.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;

use crate::evaluation::ScoreWeights;
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Provider roster keyed by column stem, in dispatch order
    #[serde(default)]
    pub providers: IndexMap<String, ProviderConfig>,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Criterion weights for automated scoring
    #[serde(default)]
    pub evaluation: ScoreWeights,
}

/// Request envelope spoken by a provider endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiKind {
    /// OpenAI-compatible `/chat/completions` (Groq, Mistral, OpenRouter)
    ChatCompletions,
    /// Cohere `/v1/chat` with a single `message` field
    Cohere,
    /// Google `generateContent`
    Gemini,
}

/// Provider-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub display_name: String,
    pub kind: ApiKind,
    pub endpoint: String,
    pub model: String,
    /// Environment variable holding the bearer credential
    pub api_key_env: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Extra request headers (OpenRouter attribution headers, etc.)
    #[serde(default)]
    pub headers: IndexMap<String, String>,
}

/// Fixed generation parameters shared by every adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

/// Batch pacing and failure policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_inter_request_delay_ms")]
    pub inter_request_delay_ms: u64,
    #[serde(default = "default_rate_limit_backoff_ms")]
    pub rate_limit_backoff_ms: u64,
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,
    /// Upper bound for a single provider call inside a fan-out
    #[serde(default = "default_provider_timeout_ms")]
    pub provider_timeout_ms: u64,
    #[serde(default = "default_backfill_delay_ms")]
    pub backfill_delay_ms: u64,
}

/// Database location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: String,
}

fn default_true() -> bool { true }
fn default_temperature() -> f32 { 0.7 }
fn default_max_tokens() -> u32 { 2048 }
fn default_inter_request_delay_ms() -> u64 { 3_000 }
fn default_rate_limit_backoff_ms() -> u64 { 30_000 }
fn default_max_consecutive_failures() -> u32 { 3 }
fn default_provider_timeout_ms() -> u64 { 120_000 }
fn default_backfill_delay_ms() -> u64 { 3_000 }
fn default_database_path() -> String { "data/llm_error_analysis.db".to_string() }

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            inter_request_delay_ms: default_inter_request_delay_ms(),
            rate_limit_backoff_ms: default_rate_limit_backoff_ms(),
            max_consecutive_failures: default_max_consecutive_failures(),
            provider_timeout_ms: default_provider_timeout_ms(),
            backfill_delay_ms: default_backfill_delay_ms(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load from default config location or return defaults
    pub fn load_or_default() -> Self {
        let config_paths = [
            "config/analysis.toml",
            "../config/analysis.toml",
            "llm-error-analysis/config/analysis.toml",
        ];

        for path in &config_paths {
            if let Ok(config) = Self::from_file(path) {
                tracing::info!("Loaded configuration from {}", path);
                return config;
            }
        }

        tracing::info!("Using default configuration");
        Self::default()
    }

    /// Save configuration to a TOML file
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
            }
        }
        fs::write(path, content)
            .map_err(|e| ConfigError::Io(e.to_string()))?;
        Ok(())
    }

    /// Enabled providers in dispatch order
    pub fn enabled_providers(&self) -> Vec<(&str, &ProviderConfig)> {
        self.providers
            .iter()
            .filter(|(_, p)| p.enabled)
            .map(|(key, p)| (key.as_str(), p))
            .collect()
    }

    /// Get a specific provider config
    pub fn get_provider(&self, key: &str) -> Option<&ProviderConfig> {
        self.providers.get(key)
    }

    /// Operator name recorded on every row
    pub fn developer_name() -> String {
        std::env::var("DEVELOPER_NAME")
            .ok()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| "Developer".to_string())
    }
}

const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

fn openrouter_headers() -> IndexMap<String, String> {
    let mut headers = IndexMap::new();
    headers.insert("HTTP-Referer".to_string(), "http://localhost:3000".to_string());
    headers.insert("X-Title".to_string(), "LLM Error Analysis Platform".to_string());
    headers
}

fn chat_provider(display_name: &str, endpoint: &str, model: &str, api_key_env: &str) -> ProviderConfig {
    ProviderConfig {
        display_name: display_name.to_string(),
        kind: ApiKind::ChatCompletions,
        endpoint: endpoint.to_string(),
        model: model.to_string(),
        api_key_env: api_key_env.to_string(),
        enabled: true,
        headers: IndexMap::new(),
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut providers = IndexMap::new();

        providers.insert(
            "groq".to_string(),
            chat_provider(
                "Groq (Llama 3.3 70B)",
                "https://api.groq.com/openai/v1/chat/completions",
                "llama-3.3-70b-versatile",
                "GROQ_API_KEY",
            ),
        );
        providers.insert(
            "mistral".to_string(),
            chat_provider(
                "Mistral",
                "https://api.mistral.ai/v1/chat/completions",
                "mistral-small-latest",
                "MISTRAL_API_KEY",
            ),
        );
        providers.insert("cohere".to_string(), ProviderConfig {
            display_name: "Cohere (command-nightly)".to_string(),
            kind: ApiKind::Cohere,
            endpoint: "https://api.cohere.ai/v1/chat".to_string(),
            model: "command-nightly".to_string(),
            api_key_env: "COHERE_API_KEY".to_string(),
            enabled: true,
            headers: IndexMap::new(),
        });

        let openrouter_models = [
            ("openrouter", "OpenRouter (Llama 3.2 3B)", "meta-llama/llama-3.2-3b-instruct:free"),
            ("openrouter_mistral", "OpenRouter (Mistral 7B)", "mistralai/mistral-7b-instruct:free"),
            ("openrouter_hermes", "OpenRouter (Hermes 405B)", "nousresearch/hermes-3-llama-3.1-405b:free"),
        ];
        for (key, display_name, model) in openrouter_models {
            let mut provider = chat_provider(display_name, OPENROUTER_URL, model, "OPENROUTER_API_KEY");
            provider.headers = openrouter_headers();
            providers.insert(key.to_string(), provider);
        }

        // Legacy first-generation provider, kept so older columns stay addressable
        providers.insert("gemini".to_string(), ProviderConfig {
            display_name: "Gemini (1.5 Flash)".to_string(),
            kind: ApiKind::Gemini,
            endpoint: "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
            model: "gemini-1.5-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            enabled: false,
            headers: IndexMap::new(),
        });

        Self {
            providers,
            generation: GenerationConfig::default(),
            batch: BatchConfig::default(),
            database: DatabaseConfig::default(),
            evaluation: ScoreWeights::default(),
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone)]
pub enum ConfigError {
    Io(String),
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}
