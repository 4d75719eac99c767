use crate::agent::role::AgentRole;
use crate::llm::{LlmProvider, TokenUsage};
use crate::tools::ToolSet;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A role-bound wrapper around a shared model client and a tool set.
///
/// Agents are immutable once built; the crew shares them behind `Arc` and runs
/// them through `&self`.
#[derive(Clone)]
pub struct Agent {
    pub id: String,
    pub role: AgentRole,
    pub llm_config: AgentModelConfig,
    pub tools: ToolSet,
    pub allow_delegation: bool,
    pub limits: ExecutionLimits,
    pub provider: Arc<dyn LlmProvider>,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.id)
            .field("role", &self.role.name)
            .field("model", &self.llm_config.model_name)
            .field("tools", &self.tools)
            .field("allow_delegation", &self.allow_delegation)
            .finish()
    }
}

/// Per-agent model settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentModelConfig {
    pub model_name: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for AgentModelConfig {
    fn default() -> Self {
        Self::new("llama3-70b-8192", 0.7, 2048)
    }
}

impl AgentModelConfig {
    pub fn new(model_name: impl Into<String>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            model_name: model_name.into(),
            temperature,
            max_tokens,
        }
    }
}

/// Bounds on a single agent run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionLimits {
    /// Model round-trips before giving up on a final answer
    pub max_iterations: usize,
    /// Consecutive tool failures tolerated before the last one is surfaced
    pub max_consecutive_tool_failures: usize,
    pub model_timeout_ms: u64,
    pub tool_timeout_ms: u64,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            max_iterations: 15,
            max_consecutive_tool_failures: 3,
            model_timeout_ms: 180_000,
            tool_timeout_ms: 60_000,
        }
    }
}

/// Detailed information about a tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Name of the tool that was called
    pub tool_name: String,
    /// Input extracted from the model's arguments
    pub input: String,
    /// Text handed back to the model
    pub result: String,
    pub execution_time_ms: u64,
    /// Any error that occurred during tool execution
    pub error: Option<String>,
    /// Result came from the per-run cache
    pub cached: bool,
}

/// Everything an agent produced for one task
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentResponse {
    pub content: String,
    pub model_calls: usize,
    pub tool_calls: Vec<ToolCall>,
    /// Roles of coworkers this run delegated to
    pub delegated_to: Vec<String>,
    pub usage: TokenUsage,
    pub execution_time_ms: u64,
}

impl AgentResponse {
    pub fn tools_used(&self) -> Vec<&str> {
        self.tool_calls.iter().map(|c| c.tool_name.as_str()).collect()
    }

    pub(crate) fn add_usage(&mut self, usage: Option<&TokenUsage>) {
        if let Some(u) = usage {
            self.usage.prompt_tokens += u.prompt_tokens;
            self.usage.completion_tokens += u.completion_tokens;
        }
    }

    pub fn total_tokens(&self) -> u32 {
        self.usage.prompt_tokens + self.usage.completion_tokens
    }
}
