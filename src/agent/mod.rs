pub mod agent;
pub mod role;
pub mod agent_constructors;
pub mod agent_execution;
pub mod agent_prompts;
pub mod delegation;
pub mod provider;

#[cfg(test)]
pub(crate) mod tests;

// Re-export main types for easier access
pub use agent::Agent;
pub use agent::AgentModelConfig;
pub use agent::AgentResponse;
pub use agent::ExecutionLimits;
pub use agent::ToolCall;
pub use agent_execution::AgentFuture;
pub use agent_prompts::Assignment;
pub use delegation::{DelegationRequest, DelegationRouter, RoleKeywordRouter, RunScope, DELEGATE_TOOL};
pub use role::*;
pub use provider::*;
