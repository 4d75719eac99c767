use std::sync::Arc;

use crate::agent::agent::{Agent, AgentModelConfig, ExecutionLimits};
use crate::agent::role::AgentRole;
use crate::llm::LlmProvider;
use crate::tools::{Tool, ToolSet};

impl Agent {
    /// Create a new Agent with no tools and delegation disabled
    pub fn new(role: AgentRole, provider: Arc<dyn LlmProvider>, llm_config: AgentModelConfig) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            llm_config,
            tools: ToolSet::new(),
            allow_delegation: false,
            limits: ExecutionLimits::default(),
            provider,
        }
    }

    pub fn with_tools(mut self, tools: ToolSet) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.insert(tool);
        self
    }

    pub fn with_delegation(mut self, allow_delegation: bool) -> Self {
        self.allow_delegation = allow_delegation;
        self
    }

    pub fn with_limits(mut self, limits: ExecutionLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn role_name(&self) -> &str {
        &self.role.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::tests::SilentProvider;

    #[test]
    fn test_agents_get_distinct_ids_and_safe_defaults() {
        let provider: Arc<dyn LlmProvider> = Arc::new(SilentProvider);
        let a = Agent::new(
            AgentRole::new("Online Researcher", "Research", ""),
            provider.clone(),
            AgentModelConfig::new("llama3-70b-8192", 0.7, 1024),
        );
        let b = Agent::new(
            AgentRole::new("Blog Manager", "Write", ""),
            provider.clone(),
            AgentModelConfig::new("llama3-70b-8192", 0.7, 1024),
        );

        assert_ne!(a.id, b.id);
        assert!(!a.allow_delegation);
        assert!(a.tools.is_empty());
        assert_eq!(a.role_name(), "Online Researcher");
        assert!(Arc::ptr_eq(&a.provider, &b.provider));
    }

    #[test]
    fn test_builder_methods_apply() {
        let agent = Agent::new(
            AgentRole::new("Reviewer", "Approve", ""),
            Arc::new(SilentProvider),
            AgentModelConfig::new("m", 0.0, 10),
        )
        .with_delegation(true)
        .with_limits(ExecutionLimits {
            max_iterations: 2,
            ..ExecutionLimits::default()
        });

        assert!(agent.allow_delegation);
        assert_eq!(agent.limits.max_iterations, 2);
    }
}
