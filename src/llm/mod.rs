pub mod openai;
pub mod retry;

pub use openai::OpenAiCompatibleProvider;
pub use retry::{RetryConfig, RetryingProvider};

use crate::error::LlmError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMessageRole {
    System,
    User,
    Assistant,
    Tool,
}

/// A function invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// Raw arguments as produced by the model, usually a JSON object
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub function: FunctionCall,
}

impl ToolCallRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatMessageRole,
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallRequest>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn new(
        role: ChatMessageRole,
        content: Option<String>,
        tool_calls: Option<Vec<ToolCallRequest>>,
        tool_call_id: Option<String>,
    ) -> Self {
        Self {
            role,
            content,
            tool_calls,
            tool_call_id,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(ChatMessageRole::System, Some(content.into()), None, None)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatMessageRole::User, Some(content.into()), None, None)
    }

    pub fn assistant_tool_calls(tool_calls: Vec<ToolCallRequest>) -> Self {
        Self::new(ChatMessageRole::Assistant, None, Some(tool_calls), None)
    }

    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(
            ChatMessageRole::Tool,
            Some(content.into()),
            None,
            Some(call_id.into()),
        )
    }

    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }
}

/// Function schema advertised to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub tools: Vec<ToolSpec>,
}

impl CompletionRequest {
    pub fn new(
        messages: Vec<ChatMessage>,
        model: String,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
        tools: Vec<ToolSpec>,
    ) -> Self {
        Self {
            messages,
            model,
            temperature,
            max_tokens,
            tools,
        }
    }

    /// Concatenated text of every message, handy for assertions and logging
    pub fn transcript(&self) -> String {
        self.messages
            .iter()
            .map(ChatMessage::text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CompletionKind {
    Message { content: String },
    ToolCall { tool_calls: Vec<ToolCallRequest> },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub kind: CompletionKind,
    pub usage: Option<TokenUsage>,
}

impl CompletionResponse {
    pub fn message(content: impl Into<String>) -> Self {
        Self {
            kind: CompletionKind::Message {
                content: content.into(),
            },
            usage: None,
        }
    }

    pub fn tool_calls(tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            kind: CompletionKind::ToolCall { tool_calls },
            usage: None,
        }
    }
}

/// A language model that answers chat completion requests, possibly with tool-call requests.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn completion(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    fn name(&self) -> &str;
}

#[async_trait]
impl LlmProvider for Box<dyn LlmProvider> {
    async fn completion(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        (**self).completion(request).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ChatMessageRole::Tool).unwrap(), "\"tool\"");
        assert_eq!(
            serde_json::to_string(&ChatMessageRole::Assistant).unwrap(),
            "\"assistant\""
        );
    }

    #[test]
    fn test_tool_result_message_carries_call_id() {
        let msg = ChatMessage::tool_result("call_1", "42");
        assert_eq!(msg.role, ChatMessageRole::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(msg.text(), "42");
    }

    #[test]
    fn test_transcript_skips_missing_content() {
        let request = CompletionRequest::new(
            vec![
                ChatMessage::system("persona"),
                ChatMessage::assistant_tool_calls(vec![ToolCallRequest::new("c", "t", "{}")]),
                ChatMessage::user("task"),
            ],
            "m".to_string(),
            None,
            None,
            vec![],
        );
        assert_eq!(request.transcript(), "persona\n\ntask");
    }
}
