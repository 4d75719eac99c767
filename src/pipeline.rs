//! Crew assembly: the built-in content-marketing pipeline and TOML-defined task graphs.

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::agent::{Agent, AgentModelConfig, AgentRole};
use crate::config::AppConfig;
use crate::crew::Crew;
use crate::error::{ConfigError, CrewError, ToolError};
use crate::llm::LlmProvider;
use crate::task::Task;
use crate::tools::{ToolSet, WebContentFetcher, WebSearchTool};

pub const ONLINE_RESEARCHER: &str = "Online Researcher";
pub const BLOG_MANAGER: &str = "Blog Manager";
pub const SOCIAL_MEDIA_MANAGER: &str = "Social Media Manager";
pub const CONTENT_MARKETING_MANAGER: &str = "Content Marketing Manager";

/// Placeholder replaced with the configured topic in task text
pub const TOPIC_PLACEHOLDER: &str = "{topic}";

pub fn online_researcher() -> AgentRole {
    AgentRole::new(
        ONLINE_RESEARCHER,
        "Research the topic online",
        "Your primary role is to function as an intelligent online research assistant. \
         You possess the capability to access a wide range of online news sources, blogs, \
         and social media platforms to gather real-time information.",
    )
}

pub fn blog_manager() -> AgentRole {
    AgentRole::new(
        BLOG_MANAGER,
        "Write the blog article",
        "You are a Blog Manager. The role of a Blog Manager encompasses several critical \
         responsibilities aimed at transforming initial drafts provided by the online researcher \
         into polished, SEO-optimized blog articles that engage and grow an audience.",
    )
}

pub fn social_media_manager() -> AgentRole {
    AgentRole::new(
        SOCIAL_MEDIA_MANAGER,
        "Write a tweet",
        "You are a Social Media Manager. The role of a Social Media Manager, particularly for \
         managing Twitter content, involves transforming the drafts from the online researcher \
         into concise, engaging tweets that resonate with the audience and adhere to platform \
         best practices.",
    )
}

pub fn content_marketing_manager() -> AgentRole {
    AgentRole::new(
        CONTENT_MARKETING_MANAGER,
        "Manage the Content Marketing Team",
        "You are an excellent Content Marketing Manager. Your primary role is to supervise each \
         publication from the 'blog manager' and the tweets written by the 'social media manager' \
         and approve them if they do not have profanity and are aligned with the initial report \
         of the online researcher.",
    )
}

/// research -> blog -> tweet -> approve, each task reading every earlier output
pub fn content_marketing_tasks(topic: &str) -> Vec<Task> {
    vec![
        Task::new(
            "research",
            format!(
                "Write me a report on {topic}. After the research online, pass the findings to the \
                 blog manager to generate a blog article. Once done, pass the findings to the social \
                 media manager to write a tweet on the subject."
            ),
            format!("Report on {topic}"),
            ONLINE_RESEARCHER,
        ),
        Task::new(
            "blog",
            "Using the research findings of the online researcher, write a blog post of at least 3 paragraphs.",
            format!("Blog Post on {topic}"),
            BLOG_MANAGER,
        ),
        Task::new(
            "tweet",
            "Using the research findings of the online researcher, write a tweet.",
            format!("Tweet on {topic}"),
            SOCIAL_MEDIA_MANAGER,
        ),
        Task::new(
            "approve",
            "Review the final output from both the blog manager and social media manager and approve \
             them if they do not have profanity and are aligned with the initial report of the online researcher.",
            format!("Final decision on the publication of the Blog Post and Tweet on {topic}"),
            CONTENT_MARKETING_MANAGER,
        ),
    ]
}

/// Web search (when enabled) plus the page fetcher
pub fn default_tools(config: &AppConfig) -> Result<ToolSet, ToolError> {
    let mut tools = ToolSet::new();
    if config.search.enabled {
        let api_key = config.search_api_key.clone().ok_or_else(|| {
            ToolError::InvalidInput("web search is enabled but no API key was loaded".to_string())
        })?;
        tools.insert(Arc::new(WebSearchTool::new(api_key, config.search.clone())?));
    }
    tools.insert(Arc::new(WebContentFetcher::new(config.fetch.clone())?));
    Ok(tools)
}

/// The four-agent content-marketing crew. Every agent shares `provider` and
/// `tools` and may delegate.
pub fn content_marketing_crew(
    provider: Arc<dyn LlmProvider>,
    tools: ToolSet,
    config: &AppConfig,
) -> Result<Crew, CrewError> {
    let agents = [
        online_researcher(),
        blog_manager(),
        social_media_manager(),
        content_marketing_manager(),
    ]
    .into_iter()
    .map(|role| {
        Arc::new(
            Agent::new(role, provider.clone(), config.model.clone())
                .with_tools(tools.clone())
                .with_delegation(true)
                .with_limits(config.limits.clone()),
        )
    })
    .collect();

    Crew::new(agents, content_marketing_tasks(&config.topic))
}

/// One `[[agents]]` entry of a pipeline file
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AgentDefinition {
    pub role: String,
    pub goal: String,
    #[serde(default)]
    pub backstory: String,
    /// Names of tools from the available set
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub allow_delegation: bool,
    /// Overrides the configured model for this agent
    #[serde(default)]
    pub model: Option<AgentModelConfig>,
}

/// A task graph loaded from TOML:
///
/// ```toml
/// [[agents]]
/// role = "Online Researcher"
/// goal = "Research the topic online"
/// tools = ["web_search", "web_fetch"]
///
/// [[tasks]]
/// id = "research"
/// description = "Write me a report on {topic}."
/// agent = "Online Researcher"
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PipelineDefinition {
    pub agents: Vec<AgentDefinition>,
    pub tasks: Vec<Task>,
}

impl PipelineDefinition {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Resolve tool names against `available` and validate the graph
    pub fn build(
        &self,
        provider: Arc<dyn LlmProvider>,
        available: &ToolSet,
        config: &AppConfig,
    ) -> Result<Crew, ConfigError> {
        let mut agents = Vec::with_capacity(self.agents.len());
        for def in &self.agents {
            let mut tools = ToolSet::new();
            for name in &def.tools {
                let tool = available.get(name).ok_or_else(|| {
                    ConfigError::Invalid(format!(
                        "agent '{}' lists unknown tool '{}' (available: {})",
                        def.role,
                        name,
                        available.names().join(", ")
                    ))
                })?;
                tools.insert(tool.clone());
            }

            let model = def.model.clone().unwrap_or_else(|| config.model.clone());
            agents.push(Arc::new(
                Agent::new(
                    AgentRole::new(&def.role, &def.goal, &def.backstory),
                    provider.clone(),
                    model,
                )
                .with_tools(tools)
                .with_delegation(def.allow_delegation)
                .with_limits(config.limits.clone()),
            ));
        }

        let tasks = self
            .tasks
            .iter()
            .map(|task| Task {
                description: task.description.replace(TOPIC_PLACEHOLDER, &config.topic),
                expected_output: task.expected_output.replace(TOPIC_PLACEHOLDER, &config.topic),
                ..task.clone()
            })
            .collect();

        Ok(Crew::new(agents, tasks)?)
    }
}
