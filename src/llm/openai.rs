use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::LlmError;
use crate::llm::{
    ChatMessage, ChatMessageRole, CompletionKind, CompletionRequest, CompletionResponse,
    FunctionCall, LlmProvider, TokenUsage, ToolCallRequest, ToolSpec,
};

#[derive(Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct WireMessage {
    role: ChatMessageRole,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_type")]
    kind: String,
    function: FunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: ToolSpec,
}

#[derive(Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireMessage,
}

#[derive(Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

/// Chat-completions client for any OpenAI-compatible endpoint (OpenAI, Groq, OpenRouter, Ollama).
pub struct OpenAiCompatibleProvider {
    base_url: String,
    api_key: Option<String>,
    http_client: reqwest::Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Result<Self, LlmError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            http_client,
        })
    }

    fn to_wire_message(message: &ChatMessage) -> WireMessage {
        WireMessage {
            role: message.role,
            content: message.content.clone(),
            tool_calls: message.tool_calls.as_ref().map(|calls| {
                calls
                    .iter()
                    .map(|call| WireToolCall {
                        id: call.id.clone(),
                        kind: function_type(),
                        function: call.function.clone(),
                    })
                    .collect()
            }),
            tool_call_id: message.tool_call_id.clone(),
        }
    }

    fn build_body(request: &CompletionRequest) -> WireRequest {
        WireRequest {
            model: request.model.clone(),
            messages: request.messages.iter().map(Self::to_wire_message).collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            tools: request
                .tools
                .iter()
                .map(|spec| WireTool {
                    kind: "function",
                    function: spec.clone(),
                })
                .collect(),
        }
    }

    fn parse_response(response: WireResponse) -> Result<CompletionResponse, LlmError> {
        let choice = response.choices.into_iter().next().ok_or(LlmError::NoChoices)?;

        let kind = match choice.message.tool_calls {
            Some(calls) if !calls.is_empty() => CompletionKind::ToolCall {
                tool_calls: calls
                    .into_iter()
                    .map(|call| ToolCallRequest {
                        id: call.id,
                        function: call.function,
                    })
                    .collect(),
            },
            _ => CompletionKind::Message {
                content: choice.message.content.unwrap_or_default(),
            },
        };

        Ok(CompletionResponse {
            kind,
            usage: response.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
            }),
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    async fn completion(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = Self::build_body(&request);

        debug!(
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending chat completion request"
        );

        let mut http_req = self.http_client.post(&url).json(&body);
        if let Some(ref key) = self.api_key {
            http_req = http_req.bearer_auth(key);
        }

        let response = http_req
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let wire: WireResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Decode(e.to_string()))?;

        Self::parse_response(wire)
    }

    fn name(&self) -> &str {
        &self.base_url
    }
}
