use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::agent::agent::{Agent, AgentResponse, ToolCall};
use crate::agent::agent_prompts::Assignment;
use crate::agent::delegation::{
    delegate_tool_spec, DelegationRequest, RunScope, DELEGATE_TOOL, MAX_DELEGATION_DEPTH,
};
use crate::crew::ExecutionContext;
use crate::error::{AgentError, ToolError};
use crate::llm::{ChatMessage, CompletionKind, CompletionRequest, CompletionResponse, ToolCallRequest};
use crate::tools::{extract_input, Tool};

pub type AgentFuture<'a> = Pin<Box<dyn Future<Output = Result<AgentResponse, AgentError>> + Send + 'a>>;

// Results of side-effect-free tools, reused within one run
type ToolCache = HashMap<(String, String), String>;

impl Agent {
    /// Run a task description against this agent's persona, with `context` as the prior outputs it may see
    pub async fn run(&self, task_description: &str, context: &ExecutionContext) -> Result<String, AgentError> {
        let assignment = Assignment {
            description: task_description,
            expected_output: None,
            context,
        };
        let scope = RunScope::standalone();
        self.run_with(&assignment, &scope).await.map(|r| r.content)
    }

    /// Run with an explicit delegation scope, returning the full response
    pub fn run_with<'a>(&'a self, assignment: &'a Assignment<'a>, scope: &'a RunScope<'a>) -> AgentFuture<'a> {
        Box::pin(self.execute(assignment, scope))
    }

    async fn execute(&self, assignment: &Assignment<'_>, scope: &RunScope<'_>) -> Result<AgentResponse, AgentError> {
        if scope.cancel.is_cancelled() {
            return Err(AgentError::Cancelled);
        }

        let start = Instant::now();
        let mut response = AgentResponse::default();
        let mut messages = self.build_initial_messages(assignment, scope);
        let mut tool_specs = self.tools.specs();
        if scope.can_delegate(self) {
            let coworkers: Vec<&str> = scope
                .coworkers_of(self)
                .iter()
                .map(|c| c.role.name.as_str())
                .collect();
            tool_specs.push(delegate_tool_spec(&coworkers));
        }
        let mut cache = ToolCache::new();
        let mut consecutive_failures = 0usize;

        info!(agent = %self.role.name, depth = scope.depth, "Agent working on task");

        for _ in 0..self.limits.max_iterations {
            let request = CompletionRequest::new(
                messages.clone(),
                self.llm_config.model_name.clone(),
                Some(self.llm_config.temperature),
                Some(self.llm_config.max_tokens),
                tool_specs.clone(),
            );
            let completion = self.call_model(request, &scope.cancel).await?;
            response.model_calls += 1;
            response.add_usage(completion.usage.as_ref());

            match completion.kind {
                CompletionKind::Message { content } => {
                    response.content = content;
                    response.execution_time_ms = start.elapsed().as_millis() as u64;
                    info!(
                        agent = %self.role.name,
                        model_calls = response.model_calls,
                        tool_calls = response.tool_calls.len(),
                        elapsed_ms = response.execution_time_ms,
                        "Agent finished task"
                    );
                    return Ok(response);
                }
                CompletionKind::ToolCall { tool_calls } => {
                    messages.push(ChatMessage::assistant_tool_calls(tool_calls.clone()));
                    for call in tool_calls {
                        let result = if call.function.name == DELEGATE_TOOL {
                            self.delegate(&call.function.arguments, assignment, scope, &mut response)
                                .await?
                        } else {
                            self.use_tool(&call, &scope.cancel, &mut cache, &mut consecutive_failures, &mut response)
                                .await?
                        };
                        messages.push(ChatMessage::tool_result(call.id, result));
                    }
                }
            }
        }

        warn!(agent = %self.role.name, limit = self.limits.max_iterations, "Agent hit iteration limit");
        Err(AgentError::IterationLimit(self.limits.max_iterations))
    }

    async fn call_model(
        &self,
        request: CompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<CompletionResponse, AgentError> {
        let timeout = Duration::from_millis(self.limits.model_timeout_ms);
        tokio::select! {
            _ = cancel.cancelled() => Err(AgentError::Cancelled),
            result = tokio::time::timeout(timeout, self.provider.completion(request)) => match result {
                Ok(Ok(completion)) => Ok(completion),
                Ok(Err(e)) => Err(e.into()),
                Err(_) => Err(AgentError::ModelUnavailable(format!(
                    "no response within {}ms",
                    timeout.as_millis()
                ))),
            },
        }
    }

    async fn invoke_tool(
        &self,
        tool: &dyn Tool,
        input: &str,
        cancel: &CancellationToken,
    ) -> Result<Result<String, ToolError>, AgentError> {
        let timeout_ms = self.limits.tool_timeout_ms;
        tokio::select! {
            _ = cancel.cancelled() => Err(AgentError::Cancelled),
            result = tokio::time::timeout(Duration::from_millis(timeout_ms), tool.invoke(input)) => {
                Ok(result.unwrap_or(Err(ToolError::Timeout(timeout_ms))))
            }
        }
    }

    /// Resolve one tool call. Tool failures become a note for the model unless
    /// too many happen in a row (a limit of 0 never gives up).
    async fn use_tool(
        &self,
        call: &ToolCallRequest,
        cancel: &CancellationToken,
        cache: &mut ToolCache,
        consecutive_failures: &mut usize,
        response: &mut AgentResponse,
    ) -> Result<String, AgentError> {
        let name = &call.function.name;
        let Some(tool) = self.tools.get(name) else {
            warn!(agent = %self.role.name, tool = %name, "Model requested unknown tool");
            let available = self.tools.names();
            return Ok(format!(
                "Tool '{}' does not exist. Available tools: {}.",
                name,
                if available.is_empty() { "none".to_string() } else { available.join(", ") }
            ));
        };

        let input = extract_input(tool.input_name(), &call.function.arguments);
        let key = (name.clone(), input.clone());

        if !tool.has_side_effects() {
            if let Some(hit) = cache.get(&key) {
                debug!(agent = %self.role.name, tool = %name, "Reusing cached tool result");
                response.tool_calls.push(ToolCall {
                    tool_name: name.clone(),
                    input,
                    result: hit.clone(),
                    execution_time_ms: 0,
                    error: None,
                    cached: true,
                });
                return Ok(hit.clone());
            }
        }

        debug!(agent = %self.role.name, tool = %name, input = %input, "Invoking tool");
        let started = Instant::now();
        let outcome = self.invoke_tool(&**tool, &input, cancel).await?;
        let execution_time_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(text) => {
                *consecutive_failures = 0;
                if !tool.has_side_effects() {
                    cache.insert(key, text.clone());
                }
                response.tool_calls.push(ToolCall {
                    tool_name: name.clone(),
                    input,
                    result: text.clone(),
                    execution_time_ms,
                    error: None,
                    cached: false,
                });
                Ok(text)
            }
            Err(err) => {
                *consecutive_failures += 1;
                warn!(agent = %self.role.name, tool = %name, error = %err, "Tool failed");
                let note = format!(
                    "Tool '{}' failed: {}. Try a different input or another approach.",
                    name, err
                );
                response.tool_calls.push(ToolCall {
                    tool_name: name.clone(),
                    input,
                    result: note.clone(),
                    execution_time_ms,
                    error: Some(err.to_string()),
                    cached: false,
                });

                let limit = self.limits.max_consecutive_tool_failures;
                if limit > 0 && *consecutive_failures >= limit {
                    return Err(AgentError::Tool(err));
                }
                Ok(note)
            }
        }
    }

    /// Hand a sub-task to a coworker picked by the scope's router
    async fn delegate(
        &self,
        arguments: &str,
        assignment: &Assignment<'_>,
        scope: &RunScope<'_>,
        response: &mut AgentResponse,
    ) -> Result<String, AgentError> {
        let request = DelegationRequest::parse(arguments);

        if scope.depth > MAX_DELEGATION_DEPTH {
            let to = request
                .map(|r| r.coworker)
                .unwrap_or_else(|_| "unknown".to_string());
            return Err(AgentError::DelegationLoop {
                from: self.role.name.clone(),
                to,
            });
        }

        if !scope.can_delegate(self) {
            return Ok(format!(
                "Delegation is not available to {}. Complete the task yourself.",
                self.role.name
            ));
        }

        let request = match request {
            Ok(request) => request,
            Err(note) => return Ok(note),
        };

        let coworkers = scope.coworkers_of(self);
        let Some(coworker) = scope.router.route(self, &request, &coworkers) else {
            let names: Vec<&str> = coworkers.iter().map(|c| c.role.name.as_str()).collect();
            return Ok(format!(
                "No coworker matches '{}'. Available coworkers: {}.",
                request.coworker,
                names.join(", ")
            ));
        };

        info!(from = %self.role.name, to = %coworker.role.name, "Delegating work");

        let description = if request.context.trim().is_empty() {
            request.task.clone()
        } else {
            format!(
                "{}\n\nAdditional context from {}: {}",
                request.task, self.role.name, request.context
            )
        };
        let sub_assignment = Assignment {
            description: &description,
            expected_output: None,
            context: assignment.context,
        };
        let sub_scope = scope.delegated();
        let delegated = coworker.run_with(&sub_assignment, &sub_scope).await?;

        response.model_calls += delegated.model_calls;
        response.add_usage(Some(&delegated.usage));
        response.delegated_to.push(coworker.role.name.clone());
        Ok(delegated.content)
    }
}
