use thiserror::Error;

/// Errors raised by a tool when the underlying action cannot complete.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ToolError {
    #[error("network failure: {0}")]
    NetworkFailure(String),

    #[error("parse failure: {0}")]
    ParseFailure(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("timed out after {0}ms")]
    Timeout(u64),
}

impl ToolError {
    /// Network failures and timeouts are worth another attempt, bad input and bad content are not
    pub fn is_transient(&self) -> bool {
        matches!(self, ToolError::NetworkFailure(_) | ToolError::Timeout(_))
    }
}

/// Errors from a language model provider
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("no choices in response")]
    NoChoices,
}

impl LlmError {
    /// Whether a retry could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::Request(_) => true,
            LlmError::Api { status, .. } => *status == 429 || *status >= 500,
            LlmError::Decode(_) | LlmError::NoChoices => false,
        }
    }
}

/// Errors an agent propagates to the orchestrator
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("delegation loop: '{from}' tried to delegate to '{to}' from inside a delegated task")]
    DelegationLoop { from: String, to: String },

    #[error("no final answer after {0} model calls")]
    IterationLimit(usize),

    #[error("tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("cancelled")]
    Cancelled,
}

impl From<LlmError> for AgentError {
    fn from(err: LlmError) -> Self {
        AgentError::ModelUnavailable(err.to_string())
    }
}

/// Errors from building or running a crew
#[derive(Debug, Error)]
pub enum CrewError {
    #[error("task '{task_id}' failed: {source}")]
    TaskFailed {
        task_id: String,
        #[source]
        source: AgentError,
    },

    #[error("task '{task_id}' is assigned to '{agent}', which is not a member of the crew")]
    UnknownAgent { task_id: String, agent: String },

    #[error("duplicate task id '{0}'")]
    DuplicateTask(String),

    #[error("task '{task_id}' depends on unknown task '{dependency}'")]
    UnknownDependency { task_id: String, dependency: String },

    #[error("dependency cycle involving tasks: {0:?}")]
    CyclicDependency(Vec<String>),

    #[error("two agents share the role '{0}'")]
    DuplicateAgent(String),

    #[error("crew has no tasks")]
    EmptyCrew,
}

impl CrewError {
    /// Id of the task that failed, for run-time failures
    pub fn failed_task(&self) -> Option<&str> {
        match self {
            CrewError::TaskFailed { task_id, .. } => Some(task_id),
            _ => None,
        }
    }
}

/// Errors from loading configuration or pipeline definitions
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("missing required credential: {0} is not set")]
    MissingCredential(&'static str),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid pipeline definition: {0}")]
    Definition(#[from] toml::de::Error),

    #[error(transparent)]
    Crew(#[from] CrewError),
}
