//! Concurrent fan-out of one prompt to every provider

use indexmap::IndexMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::providers::{is_rate_limit_signal, is_sentinel, sentinel, LLMProvider, ProviderError};

/// Outcome of one provider call within a dispatch
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderReply {
    /// Generated text, or sentinel text on failure
    pub text: String,
    /// Wall-clock latency; `None` when the call timed out or its task died
    pub elapsed_ms: Option<u64>,
}

impl ProviderReply {
    pub fn is_error(&self) -> bool {
        is_sentinel(&self.text)
    }

    pub fn is_rate_limited(&self) -> bool {
        is_rate_limit_signal(&self.text)
    }
}

/// Replies keyed by provider name, in declared provider order
pub type DispatchResult = IndexMap<String, ProviderReply>;

/// Settle-all dispatcher with a per-provider timeout
pub struct Dispatcher {
    providers: Vec<Arc<dyn LLMProvider>>,
    timeout_ms: u64,
}

impl Dispatcher {
    pub fn new(providers: Vec<Arc<dyn LLMProvider>>, timeout_ms: u64) -> Self {
        Self { providers, timeout_ms }
    }

    pub fn providers(&self) -> &[Arc<dyn LLMProvider>] {
        &self.providers
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Send `prompt` to every provider concurrently and wait for all of them.
    ///
    /// Every provider gets an entry. A slow or broken provider never cancels
    /// its siblings: each call runs in its own task under `timeout_ms`, and
    /// timeouts or panics are recorded as sentinel text.
    pub async fn dispatch(&self, prompt: &str) -> DispatchResult {
        let prompt: Arc<str> = Arc::from(prompt);
        let timeout = Duration::from_millis(self.timeout_ms);
        let timeout_ms = self.timeout_ms;

        let mut handles = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            let name = provider.name().to_string();
            let provider = Arc::clone(provider);
            let prompt = Arc::clone(&prompt);

            let handle = tokio::spawn(async move {
                let start = Instant::now();
                match tokio::time::timeout(timeout, provider.analyze(&prompt)).await {
                    Ok(text) => ProviderReply {
                        text,
                        elapsed_ms: Some(start.elapsed().as_millis() as u64),
                    },
                    Err(_) => {
                        tracing::warn!("{} timed out after {}ms", provider.display_name(), timeout_ms);
                        ProviderReply {
                            text: sentinel(ProviderError::Timeout { timeout_ms }),
                            elapsed_ms: None,
                        }
                    }
                }
            });
            handles.push((name, handle));
        }

        let mut results = IndexMap::with_capacity(handles.len());
        for (name, handle) in handles {
            let reply = match handle.await {
                Ok(reply) => reply,
                Err(e) => {
                    tracing::error!("{} task failed: {}", name, e);
                    ProviderReply {
                        text: sentinel(format!("Provider task failed: {}", e)),
                        elapsed_ms: None,
                    }
                }
            };
            results.insert(name, reply);
        }

        results
    }
}
