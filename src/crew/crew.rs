use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::agent::{Agent, AgentResponse, Assignment, DelegationRouter, RoleKeywordRouter, RunScope};
use crate::crew::context::{ExecutionContext, TaskOutput};
use crate::crew::graph;
use crate::error::{AgentError, CrewError};
use crate::task::Task;

/// Result of a successful crew run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrewOutput {
    /// Output of the last task executed
    pub final_output: String,
    /// Every task output, in execution order
    pub task_outputs: Vec<TaskOutput>,
    /// Per-task agent responses, parallel to `task_outputs`
    pub responses: Vec<AgentResponse>,
}

impl CrewOutput {
    pub fn output_of(&self, task_id: &str) -> Option<&str> {
        self.task_outputs
            .iter()
            .find(|o| o.task_id == task_id)
            .map(|o| o.output.as_str())
    }

    pub fn model_calls(&self) -> usize {
        self.responses.iter().map(|r| r.model_calls).sum()
    }
}

/// A validated set of agents and tasks.
///
/// Construction rejects anything that would fail before the first model call:
/// duplicate ids or roles, tasks assigned to strangers, unknown or cyclic
/// dependencies. `kickoff` then runs the tasks one at a time in dependency order.
pub struct Crew {
    agents: Vec<Arc<Agent>>,
    tasks: Vec<Task>,
    /// Indices into `tasks`
    order: Vec<usize>,
    /// Dependency indices per task
    dependencies: Vec<Vec<usize>>,
    /// Index into `agents` per task
    assignees: Vec<usize>,
    router: Arc<dyn DelegationRouter>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for Crew {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crew")
            .field("agents", &self.agents.iter().map(|a| a.role.name.as_str()).collect::<Vec<_>>())
            .field("order", &self.execution_order().iter().map(|t| t.id.as_str()).collect::<Vec<_>>())
            .finish()
    }
}

impl Crew {
    pub fn new(agents: Vec<Arc<Agent>>, tasks: Vec<Task>) -> Result<Self, CrewError> {
        if tasks.is_empty() {
            return Err(CrewError::EmptyCrew);
        }

        let mut roles: HashMap<String, usize> = HashMap::with_capacity(agents.len());
        for (i, agent) in agents.iter().enumerate() {
            if roles.insert(agent.role.name.to_lowercase(), i).is_some() {
                return Err(CrewError::DuplicateAgent(agent.role.name.clone()));
            }
        }

        let assignees = tasks
            .iter()
            .map(|task| {
                roles
                    .get(&task.agent.to_lowercase())
                    .copied()
                    .ok_or_else(|| CrewError::UnknownAgent {
                        task_id: task.id.clone(),
                        agent: task.agent.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let dependencies = graph::resolve_dependencies(&tasks)?;
        let order = graph::execution_order(&tasks, &dependencies)?;

        Ok(Self {
            agents,
            tasks,
            order,
            dependencies,
            assignees,
            router: Arc::new(RoleKeywordRouter),
            cancel: CancellationToken::new(),
        })
    }

    pub fn with_router(mut self, router: Arc<dyn DelegationRouter>) -> Self {
        self.router = router;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Cancelling this token stops the run at the next model or tool boundary
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn agents(&self) -> &[Arc<Agent>] {
        &self.agents
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn execution_order(&self) -> Vec<&Task> {
        self.order.iter().map(|&i| &self.tasks[i]).collect()
    }

    /// Run every task and return the output of the last one executed
    pub async fn kickoff(&self) -> Result<String, CrewError> {
        self.kickoff_detailed().await.map(|out| out.final_output)
    }

    /// Run every task, stopping at the first failure
    pub async fn kickoff_detailed(&self) -> Result<CrewOutput, CrewError> {
        let started = Instant::now();
        let scope = RunScope::new(&self.agents, self.router.as_ref(), self.cancel.clone());
        let mut context = ExecutionContext::new();
        let mut responses = Vec::with_capacity(self.tasks.len());

        info!(tasks = self.tasks.len(), agents = self.agents.len(), "Crew kickoff");

        for &index in &self.order {
            let task = &self.tasks[index];
            let agent = &self.agents[self.assignees[index]];

            if self.cancel.is_cancelled() {
                return Err(self.fail(task, AgentError::Cancelled));
            }

            let dependency_ids: Vec<&str> = self.dependencies[index]
                .iter()
                .map(|&d| self.tasks[d].id.as_str())
                .collect();
            let view = context.view(&dependency_ids);
            let assignment = Assignment {
                description: &task.description,
                expected_output: task.expected_output(),
                context: &view,
            };

            info!(task = %task.id, agent = %agent.role.name, inputs = view.len(), "Starting task");
            let response = match agent.run_with(&assignment, &scope).await {
                Ok(response) => response,
                Err(e) => return Err(self.fail(task, e)),
            };
            info!(
                task = %task.id,
                model_calls = response.model_calls,
                tool_calls = response.tool_calls.len(),
                delegated_to = ?response.delegated_to,
                "Task complete"
            );

            context.push(TaskOutput::new(&task.id, &agent.role.name, response.content.clone()));
            responses.push(response);
        }

        let task_outputs = context.into_outputs();
        let final_output = task_outputs
            .last()
            .map(|o| o.output.clone())
            .unwrap_or_default();

        info!(elapsed_ms = started.elapsed().as_millis() as u64, "Crew finished");
        Ok(CrewOutput {
            final_output,
            task_outputs,
            responses,
        })
    }

    fn fail(&self, task: &Task, source: AgentError) -> CrewError {
        error!(task = %task.id, error = %source, "Task failed, aborting crew");
        CrewError::TaskFailed {
            task_id: task.id.clone(),
            source,
        }
    }
}
