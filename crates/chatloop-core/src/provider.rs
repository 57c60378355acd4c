//! LLM Provider Strategy Pattern
//!
//! Defines the one call the tool loop makes into a language model, so the
//! loop works with any backend (OpenRouter, OpenAI, a local server, or a
//! scripted stub in tests) without code changes.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chatloop_core::provider::{GenerationOptions, LlmProvider};
//!
//! let provider = OpenAiCompatProvider::from_config(config)?;
//! let completion = provider.complete(conversation.messages(), &schemas, &options).await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message::Message;
use crate::tool::{RequestedCall, ToolSchema};

/// Configuration for LLM generation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Model identifier (e.g., "anthropic/claude-3.5-sonnet", "openai/gpt-4o-mini")
    pub model: String,

    /// Temperature for sampling (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Top-p nucleus sampling
    #[serde(default)]
    pub top_p: Option<f32>,

    /// System prompt, sent ahead of the conversation
    #[serde(default)]
    pub system_prompt: Option<String>,
}

pub const DEFAULT_MODEL: &str = "anthropic/claude-3.5-sonnet";

const fn default_temperature() -> f32 {
    0.7
}

const fn default_max_tokens() -> u32 {
    4096
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.into(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: None,
            system_prompt: None,
        }
    }
}

impl GenerationOptions {
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}

/// Assistant reply produced by one model call
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Completion {
    /// Generated text, if any
    pub content: Option<String>,

    /// Tool invocations requested by the model, in issue order
    #[serde(default)]
    pub tool_calls: Vec<RequestedCall>,

    /// Model that generated this response
    pub model: String,

    /// Token usage statistics (if available)
    pub usage: Option<TokenUsage>,

    /// Finish reason
    pub finish_reason: Option<FinishReason>,
}

impl Completion {
    /// Plain text answer with no tool requests
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            finish_reason: Some(FinishReason::Stop),
            ..Default::default()
        }
    }

    /// Answer that requests tool calls
    pub fn with_tool_calls(tool_calls: Vec<RequestedCall>) -> Self {
        Self {
            tool_calls,
            finish_reason: Some(FinishReason::ToolUse),
            ..Default::default()
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Token usage statistics
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Reason for completion finishing
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolUse,
    ContentFilter,
    Error,
}

impl FinishReason {
    /// Map an OpenAI-style `finish_reason` string
    pub fn from_openai(reason: &str) -> Self {
        match reason {
            "length" => Self::Length,
            "tool_calls" | "function_call" => Self::ToolUse,
            "content_filter" => Self::ContentFilter,
            "error" => Self::Error,
            _ => Self::Stop,
        }
    }
}

/// Strategy trait for LLM providers
///
/// Implement this trait to add support for new LLM backends.
/// The loop works exclusively through this interface.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name for logs and banners
    fn name(&self) -> &str;

    /// Check if the provider is reachable and configured correctly
    async fn health_check(&self) -> Result<bool>;

    /// Ask the model for the next assistant message
    ///
    /// `tools` lists what the model may request; an empty slice means the
    /// model must answer in plain text. Transport failures surface as
    /// [`crate::AgentError::ModelUnavailable`].
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
        options: &GenerationOptions,
    ) -> Result<Completion>;
}
