#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use content_crew::llm::{ChatMessageRole, CompletionRequest, CompletionResponse, LlmProvider};
use content_crew::{Agent, AgentModelConfig, AgentRole, LlmError};

/// Role named by the system prompt ("You are <role>. ...")
pub fn role_of(request: &CompletionRequest) -> String {
    let system = message_text(request, ChatMessageRole::System);
    let persona = system.strip_prefix("You are ").unwrap_or(&system);
    persona
        .split(". ")
        .next()
        .unwrap_or_default()
        .trim_end_matches('.')
        .to_string()
}

/// Task description from the user prompt ("Current Task: <description>\n\n...")
pub fn task_of(request: &CompletionRequest) -> String {
    let user = message_text(request, ChatMessageRole::User);
    let task = user.strip_prefix("Current Task: ").unwrap_or(&user);
    task.split("\n\n").next().unwrap_or_default().to_string()
}

fn message_text(request: &CompletionRequest, role: ChatMessageRole) -> String {
    request
        .messages
        .iter()
        .find(|m| m.role == role)
        .map(|m| m.text().to_string())
        .unwrap_or_default()
}

pub fn echo(request: &CompletionRequest) -> String {
    format!("{} says: {}", role_of(request), task_of(request))
}

/// Deterministic stub: answers every request with `echo`, optionally failing
/// for one role, and records what it was sent.
#[derive(Default)]
pub struct EchoLlm {
    fail_for: Option<String>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl EchoLlm {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_for(role: &str) -> Arc<Self> {
        Arc::new(Self {
            fail_for: Some(role.to_string()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn roles_called(&self) -> Vec<String> {
        self.requests().iter().map(role_of).collect()
    }
}

#[async_trait]
impl LlmProvider for EchoLlm {
    async fn completion(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let role = role_of(&request);
        self.requests.lock().unwrap().push(request.clone());
        if self.fail_for.as_deref() == Some(role.as_str()) {
            return Err(LlmError::Api {
                status: 503,
                body: "model overloaded".to_string(),
            });
        }
        Ok(CompletionResponse::message(echo(&request)))
    }

    fn name(&self) -> &str {
        "echo"
    }
}

pub fn agent(role: &str, llm: Arc<EchoLlm>) -> Arc<Agent> {
    Arc::new(Agent::new(
        AgentRole::new(role, format!("Act as {role}"), ""),
        llm,
        AgentModelConfig::new("stub", 0.0, 128),
    ))
}
