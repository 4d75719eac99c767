use serde::{Deserialize, Serialize};

/// A unit of work for exactly one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique within a crew
    pub id: String,
    pub description: String,
    /// Acceptance criteria handed to the model
    #[serde(default)]
    pub expected_output: String,
    /// Role name of the assigned agent
    pub agent: String,
    /// Ids of the tasks whose outputs this task reads. `None` means every
    /// task declared before it.
    #[serde(default)]
    pub context: Option<Vec<String>>,
}

impl Task {
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        expected_output: impl Into<String>,
        agent: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            expected_output: expected_output.into(),
            agent: agent.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, task_ids: Vec<String>) -> Self {
        self.context = Some(task_ids);
        self
    }

    /// Non-empty acceptance criteria, if any
    pub fn expected_output(&self) -> Option<&str> {
        let trimmed = self.expected_output.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}
