use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Output of one completed task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskOutput {
    pub task_id: String,
    pub agent_role: String,
    pub output: String,
    pub completed_at: DateTime<Utc>,
}

impl TaskOutput {
    pub fn new(task_id: impl Into<String>, agent_role: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            agent_role: agent_role.into(),
            output: output.into(),
            completed_at: Utc::now(),
        }
    }
}

/// Append-only record of task outputs for one crew run, in completion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionContext {
    outputs: Vec<TaskOutput>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, output: TaskOutput) {
        self.outputs.push(output);
    }

    pub fn get(&self, task_id: &str) -> Option<&TaskOutput> {
        self.outputs.iter().find(|o| o.task_id == task_id)
    }

    pub fn outputs(&self) -> &[TaskOutput] {
        &self.outputs
    }

    pub fn task_ids(&self) -> Vec<&str> {
        self.outputs.iter().map(|o| o.task_id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// The outputs of `task_ids` only, keeping completion order
    pub fn view<S: AsRef<str>>(&self, task_ids: &[S]) -> ExecutionContext {
        ExecutionContext {
            outputs: self
                .outputs
                .iter()
                .filter(|o| task_ids.iter().any(|id| id.as_ref() == o.task_id))
                .cloned()
                .collect(),
        }
    }

    /// Text block handed to the model
    pub fn render(&self) -> String {
        self.outputs
            .iter()
            .map(|o| {
                format!(
                    "--- Output of task '{}' ({}) ---\n{}",
                    o.task_id,
                    o.agent_role,
                    o.output.trim()
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn into_outputs(self) -> Vec<TaskOutput> {
        self.outputs
    }
}
