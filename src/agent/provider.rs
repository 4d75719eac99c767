use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::llm::{LlmProvider, OpenAiCompatibleProvider, RetryConfig, RetryingProvider};

/// LLM providers reachable through an OpenAI-compatible chat completions API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAI,
    Groq,
    OpenRouter,
    /// Ollama local models, no key needed
    Ollama,
    /// Any other compatible endpoint; the value is its base URL
    Custom(String),
}

impl Provider {
    /// Get the base URL for the provider
    pub fn get_base_url(&self) -> String {
        match self {
            Provider::OpenAI => "https://api.openai.com/v1".to_string(),
            Provider::Groq => "https://api.groq.com/openai/v1".to_string(),
            Provider::OpenRouter => "https://openrouter.ai/api/v1".to_string(),
            Provider::Ollama => "http://localhost:11434/v1".to_string(),
            Provider::Custom(url) => url.clone(),
        }
    }

    /// Environment variable holding the API key, if the provider needs one
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            Provider::OpenAI => Some("OPENAI_API_KEY"),
            Provider::Groq => Some("GROQ_API_KEY"),
            Provider::OpenRouter => Some("OPENROUTER_API_KEY"),
            Provider::Ollama | Provider::Custom(_) => None,
        }
    }
}

/// Connection settings for the model client shared by all agents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: Provider,
    /// Loaded from the environment at startup, never from config files
    #[serde(skip)]
    pub api_key: Option<String>,
    /// Custom base URL (overrides default for provider)
    pub base_url: Option<String>,
    pub request_timeout_ms: u64,
    pub retry: RetryConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self::new(Provider::Groq, None)
    }
}

impl LlmConfig {
    pub fn new(provider: Provider, api_key: Option<String>) -> Self {
        Self {
            provider,
            api_key,
            base_url: None,
            request_timeout_ms: 120_000,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn resolved_base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.provider.get_base_url())
    }
}

/// Build the shared model client: an OpenAI-compatible provider behind bounded retries
pub fn build_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    let base = OpenAiCompatibleProvider::new(
        config.resolved_base_url(),
        config.api_key.clone(),
        Duration::from_millis(config.request_timeout_ms),
    )?;
    Ok(Arc::new(RetryingProvider::new(base, config.retry.clone())))
}
