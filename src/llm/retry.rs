use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::LlmError;
use crate::llm::{CompletionRequest, CompletionResponse, LlmProvider};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Backoff before retry number `attempt` (zero-based), capped at `max_delay_ms`
    pub fn delay_for(&self, attempt: u32) -> u64 {
        let base = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        let jitter = (base * 0.1 * jitter_fraction(attempt)) as u64;
        (base as u64).saturating_add(jitter).min(self.max_delay_ms)
    }
}

// Deterministic jitter so tests stay reproducible
fn jitter_fraction(attempt: u32) -> f64 {
    let x = attempt.wrapping_mul(2654435761);
    (x % 100) as f64 / 100.0
}

/// Retries transient provider failures (connection errors, 429, 5xx) with exponential backoff.
pub struct RetryingProvider<T: LlmProvider> {
    inner: T,
    config: RetryConfig,
}

impl<T: LlmProvider> RetryingProvider<T> {
    pub fn new(inner: T, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl<T: LlmProvider> LlmProvider for RetryingProvider<T> {
    async fn completion(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let mut attempt = 0;
        loop {
            match self.inner.completion(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) if attempt < self.config.max_retries && e.is_retryable() => {
                    let delay = self.config.delay_for(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_retries = self.config.max_retries,
                        delay_ms = delay,
                        error = %e,
                        "Retrying model request"
                    );
                    tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
