use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::agent::{AgentModelConfig, ExecutionLimits, LlmConfig};
use crate::error::ConfigError;
use crate::tools::{FetchConfig, SearchConfig};

pub const DEFAULT_TOPIC: &str = "the last Real Madrid vs Barcelona soccer match";

/// Environment variable holding the web search key
pub const SEARCH_API_KEY_ENV: &str = "TAVILY_API_KEY";

/// Everything the binary needs besides the pipeline itself.
///
/// Sources, lowest precedence first: built-in defaults, a TOML file, then
/// `CREW__`-prefixed environment variables (`CREW__LLM__PROVIDER=openai`,
/// `CREW__MODEL__MODEL_NAME=gpt-4o-mini`, `CREW__TOPIC=...`). API keys only come
/// from the environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Subject the built-in content pipeline writes about
    pub topic: String,
    pub llm: LlmConfig,
    pub model: AgentModelConfig,
    pub limits: ExecutionLimits,
    pub fetch: FetchConfig,
    pub search: SearchConfig,
    #[serde(skip)]
    pub search_api_key: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            topic: DEFAULT_TOPIC.to_string(),
            llm: LlmConfig::default(),
            model: AgentModelConfig::default(),
            limits: ExecutionLimits::default(),
            fetch: FetchConfig::default(),
            search: SearchConfig::default(),
            search_api_key: None,
        }
    }
}

impl AppConfig {
    /// Load from `path` if given (it must exist), otherwise from an optional
    /// `crew.toml` in the working directory, with environment overrides on top.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(p) => ::config::File::from(p).required(true),
            None => ::config::File::with_name("crew").required(false),
        };

        let settings = ::config::Config::builder()
            .add_source(file)
            .add_source(
                ::config::Environment::with_prefix("CREW")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.model_name.trim().is_empty() {
            return Err(ConfigError::Invalid("model.model_name must not be empty".to_string()));
        }
        if self.limits.max_iterations == 0 {
            return Err(ConfigError::Invalid("limits.max_iterations must be at least 1".to_string()));
        }
        if self.fetch.max_body_bytes == 0 {
            return Err(ConfigError::Invalid("fetch.max_body_bytes must be at least 1".to_string()));
        }
        if self.search.enabled && self.search.max_results == 0 {
            return Err(ConfigError::Invalid("search.max_results must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Fill in API keys from the process environment
    pub fn load_credentials(&mut self) -> Result<(), ConfigError> {
        self.resolve_credentials(|name| std::env::var(name).ok())
    }

    /// Fill in API keys using `lookup`. Empty values count as missing.
    pub fn resolve_credentials<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let find = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(var) = self.llm.provider.api_key_env() {
            match find(var) {
                Some(key) => self.llm.api_key = Some(key),
                None => return Err(ConfigError::MissingCredential(var)),
            }
        }

        if self.search.enabled {
            match find(SEARCH_API_KEY_ENV) {
                Some(key) => self.search_api_key = Some(key),
                None => return Err(ConfigError::MissingCredential(SEARCH_API_KEY_ENV)),
            }
        }

        Ok(())
    }
}
