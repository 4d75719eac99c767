pub mod agent;
pub mod config;
pub mod crew;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod task;
pub mod tools;

pub use agent::{Agent, AgentModelConfig, AgentResponse, AgentRole, ExecutionLimits, LlmConfig, Provider};
pub use config::AppConfig;
pub use crew::{Crew, CrewOutput, ExecutionContext, TaskOutput};
pub use error::{AgentError, ConfigError, CrewError, LlmError, ToolError};
pub use llm::LlmProvider;
pub use task::Task;
pub use tools::{Tool, ToolSet, WebContentFetcher};
