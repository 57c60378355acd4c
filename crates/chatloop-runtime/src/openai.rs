//! OpenAI-Compatible Provider
//!
//! Implementation of `LlmProvider` over the `/chat/completions` API spoken
//! by OpenRouter, OpenAI, and local servers such as Ollama's `/v1`.

use std::time::Duration;

use async_trait::async_trait;
use chatloop_core::{
    error::{AgentError, Result},
    message::Message,
    provider::{Completion, FinishReason, GenerationOptions, LlmProvider, TokenUsage},
    tool::{RequestedCall, ToolSchema},
};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ProviderConfig;

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct WireMessage {
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

impl WireMessage {
    fn text(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
            name: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireToolCall {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "type", default = "function_type")]
    kind: String,
    function: WireFunctionCall,
}

fn function_type() -> String {
    "function".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    /// JSON-encoded string per the API; some servers send an object instead
    #[serde(default)]
    arguments: Option<Value>,
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunctionDefinition,
}

#[derive(Debug, Serialize)]
struct WireFunctionDefinition {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
    #[serde(default)]
    error: Option<WireError>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct WireError {
    message: String,
    #[serde(default)]
    code: Option<Value>,
}

// ============================================================================
// Provider
// ============================================================================

/// Provider for any OpenAI-compatible chat-completions endpoint
pub struct OpenAiCompatProvider {
    client: Client,
    config: ProviderConfig,
}

impl OpenAiCompatProvider {
    /// Create from configuration
    pub fn from_config(config: ProviderConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Config(format!("HTTP client: {e}")))?;

        tracing::info!(base_url = %config.base_url, model = %config.model, "Provider configured");

        Ok(Self { client, config })
    }

    /// Create from `OPENROUTER_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_config(ProviderConfig::from_env()?)
    }

    pub const fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Convert conversation messages to wire format
    pub(crate) fn convert_messages(messages: &[Message], system_prompt: Option<&str>) -> Vec<WireMessage> {
        let mut wire = Vec::with_capacity(messages.len() + 1);

        if let Some(prompt) = system_prompt {
            wire.push(WireMessage::text("system", prompt));
        }

        for message in messages {
            let converted = match message {
                Message::User { content, .. } => WireMessage::text("user", content.clone()),
                Message::Assistant {
                    content, tool_calls, ..
                } => WireMessage {
                    role: "assistant".into(),
                    content: content.clone(),
                    tool_calls: (!tool_calls.is_empty()).then(|| {
                        tool_calls
                            .iter()
                            .map(|call| WireToolCall {
                                id: Some(call.id.clone()),
                                kind: function_type(),
                                function: WireFunctionCall {
                                    name: call.name.clone(),
                                    arguments: Some(Value::String(
                                        Value::Object(call.arguments.clone()).to_string(),
                                    )),
                                },
                            })
                            .collect()
                    }),
                    tool_call_id: None,
                    name: None,
                },
                Message::Tool {
                    tool_call_id,
                    name,
                    content,
                    ..
                } => WireMessage {
                    role: "tool".into(),
                    content: Some(content.clone()),
                    tool_calls: None,
                    tool_call_id: Some(tool_call_id.clone()),
                    name: Some(name.clone()),
                },
            };
            wire.push(converted);
        }

        wire
    }

    fn convert_tools(tools: &[ToolSchema]) -> Vec<WireTool> {
        tools
            .iter()
            .map(|schema| WireTool {
                kind: "function",
                function: WireFunctionDefinition {
                    name: schema.name.clone(),
                    description: schema.description.clone(),
                    parameters: schema.json_schema(),
                },
            })
            .collect()
    }

    pub(crate) fn build_request(
        messages: &[Message],
        tools: &[ToolSchema],
        options: &GenerationOptions,
    ) -> ChatRequest {
        ChatRequest {
            model: options.model.clone(),
            messages: Self::convert_messages(messages, options.system_prompt.as_deref()),
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            top_p: options.top_p,
            tools: Self::convert_tools(tools),
            tool_choice: (!tools.is_empty()).then_some("auto"),
        }
    }

    /// Decode tool-call arguments; `None` marks a malformed call
    fn decode_arguments(raw: Option<Value>) -> Option<Value> {
        match raw? {
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => serde_json::from_str(&s)
                .inspect_err(|e| tracing::warn!(error = %e, "Unparseable tool arguments"))
                .ok(),
            other => Some(other),
        }
    }

    /// Convert a wire response to a completion
    pub(crate) fn convert_response(response: ChatResponse, model: &str) -> Result<Completion> {
        if let Some(error) = response.error {
            let code = error.code.map(|c| c.to_string()).unwrap_or_default();
            return Err(AgentError::Provider(format!("{} {}", error.message, code).trim().to_string()));
        }

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Parse("response has no choices".into()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| RequestedCall {
                id: call.id,
                name: call.function.name,
                arguments: Self::decode_arguments(call.function.arguments),
            })
            .collect();

        Ok(Completion {
            content: choice.message.content.filter(|c| !c.is_empty()),
            tool_calls,
            model: response.model.unwrap_or_else(|| model.to_string()),
            usage: response.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            finish_reason: choice.finish_reason.as_deref().map(FinishReason::from_openai),
        })
    }

    /// Map an HTTP error status to an error kind
    pub(crate) fn status_error(status: StatusCode, body: &str) -> AgentError {
        let detail = format!("{status}: {body}");
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AgentError::Auth(detail),
            StatusCode::TOO_MANY_REQUESTS => AgentError::RateLimited(detail),
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
                AgentError::ModelUnavailable(detail)
            }
            s if s.is_server_error() => AgentError::ModelUnavailable(detail),
            _ => AgentError::Provider(detail),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    async fn health_check(&self) -> Result<bool> {
        let response = self
            .client
            .get(self.endpoint("models"))
            .bearer_auth(&self.config.api_key)
            .send()
            .await;

        match response {
            Ok(r) => Ok(r.status().is_success()),
            Err(e) => {
                tracing::warn!("Provider health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        let request = Self::build_request(messages, tools, options);
        tracing::debug!(model = %request.model, messages = request.messages.len(), tools = request.tools.len(), "Sending chat request");

        let response = self
            .client
            .post(self.endpoint("chat/completions"))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AgentError::ModelUnavailable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AgentError::ModelUnavailable(e.to_string()))?;

        if !status.is_success() {
            tracing::error!(%status, "Chat request rejected");
            return Err(Self::status_error(status, &body));
        }

        let parsed: ChatResponse =
            serde_json::from_str(&body).map_err(|e| AgentError::Parse(e.to_string()))?;

        let completion = Self::convert_response(parsed, &options.model)?;
        if let Some(usage) = completion.usage {
            tracing::debug!(
                prompt = usage.prompt_tokens,
                completion = usage.completion_tokens,
                "Token usage"
            );
        }

        Ok(completion)
    }
}
