//! Conversation Messages
//!
//! Message format shared by the loop, the providers and the front ends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tool::{ToolCall, ToolResult};

/// Role of a message sender
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User input
    User,
    /// Assistant (LLM) response
    Assistant,
    /// Tool result answering an assistant invocation
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::Tool => write!(f, "tool"),
        }
    }
}

/// A single message in a conversation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    User {
        content: String,

        #[serde(default = "Utc::now")]
        timestamp: DateTime<Utc>,
    },

    Assistant {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,

        /// Pending tool invocations, in the order the model issued them
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,

        #[serde(default = "Utc::now")]
        timestamp: DateTime<Utc>,
    },

    Tool {
        /// Correlation id of the invocation this answers
        tool_call_id: String,

        name: String,

        content: String,

        #[serde(default)]
        is_error: bool,

        #[serde(default = "Utc::now")]
        timestamp: DateTime<Utc>,
    },
}

impl Message {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a plain assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: Some(content.into()),
            tool_calls: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    /// Create an assistant message that requests tool calls
    pub fn assistant_with_calls(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self::Assistant {
            content,
            tool_calls,
            timestamp: Utc::now(),
        }
    }

    /// Create a tool message from an execution result
    pub fn tool(result: &ToolResult) -> Self {
        Self::Tool {
            tool_call_id: result.id.clone(),
            name: result.name.clone(),
            content: result.output.clone(),
            is_error: !result.success,
            timestamp: Utc::now(),
        }
    }

    pub const fn role(&self) -> Role {
        match self {
            Self::User { .. } => Role::User,
            Self::Assistant { .. } => Role::Assistant,
            Self::Tool { .. } => Role::Tool,
        }
    }

    /// Text content, if any
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::User { content, .. } | Self::Tool { content, .. } => Some(content),
            Self::Assistant { content, .. } => content.as_deref(),
        }
    }

    /// Tool invocations carried by an assistant message
    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Self::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }

    /// Estimate token count (rough approximation)
    #[allow(clippy::cast_possible_truncation)]
    pub fn estimate_tokens(&self) -> u32 {
        let calls: usize = self
            .tool_calls()
            .iter()
            .map(|c| c.name.len() + serde_json::Value::Object(c.arguments.clone()).to_string().len())
            .sum();
        // ~4 characters per token, +4 for role overhead
        ((self.text().map_or(0, str::len) + calls) / 4) as u32 + 4
    }
}

/// Conversation history
///
/// Append-only: entries are never removed, rewritten or reordered.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Append every message of `staged` past index `from`
    ///
    /// Used to commit a turn that was built on a working copy of this
    /// conversation.
    pub(crate) fn commit_from(&mut self, staged: Self, from: usize) {
        debug_assert!(from >= self.messages.len());
        self.messages.extend(staged.messages.into_iter().skip(from));
    }

    /// Get all messages
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Get the last message
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    /// Estimate total tokens in conversation
    pub fn estimate_tokens(&self) -> u32 {
        self.messages.iter().map(Message::estimate_tokens).sum()
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Check that every tool message answers an invocation of the closest
    /// preceding assistant message, in issue order, with no user message in
    /// between.
    pub fn is_well_formed(&self) -> bool {
        let mut pending: &[ToolCall] = &[];
        for message in &self.messages {
            match message {
                Message::Assistant { tool_calls, .. } => {
                    if !pending.is_empty() {
                        return false;
                    }
                    pending = tool_calls;
                }
                Message::Tool { tool_call_id, .. } => match pending.split_first() {
                    Some((call, rest)) if call.id == *tool_call_id => pending = rest,
                    _ => return false,
                },
                Message::User { .. } => {
                    if !pending.is_empty() {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Render the last `limit` messages as plain text
    pub fn render(&self, limit: usize) -> String {
        let start = self.messages.len().saturating_sub(limit);
        let lines: Vec<String> = self.messages[start..]
            .iter()
            .filter_map(|m| match m {
                Message::User { content, .. } => Some(format!("User: {content}")),
                Message::Assistant { content: Some(text), .. } if !text.is_empty() => {
                    Some(format!("Assistant: {text}"))
                }
                Message::Tool { name, content, .. } => Some(format!("Tool ({name}): {content}")),
                Message::Assistant { .. } => None,
            })
            .collect();

        lines.join("\n")
    }
}

impl<'a> IntoIterator for &'a Conversation {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::ToolArguments;

    fn call(id: &str) -> ToolCall {
        ToolCall {
            id: id.into(),
            name: "clock".into(),
            arguments: ToolArguments::new(),
        }
    }

    #[test]
    fn test_message_creation() {
        let msg = Message::user("Hello");
        assert_eq!(msg.role(), Role::User);
        assert_eq!(msg.text(), Some("Hello"));
        assert!(msg.tool_calls().is_empty());
    }

    #[test]
    fn test_conversation() {
        let mut conv = Conversation::new();
        conv.push(Message::user("Hi"));
        conv.push(Message::assistant("Hello!"));

        assert_eq!(conv.len(), 2);
        assert_eq!(conv.last().map(Message::role), Some(Role::Assistant));
    }

    #[test]
    fn test_estimate_tokens_counts_calls() {
        let mut conv = Conversation::new();
        assert_eq!(conv.estimate_tokens(), 0);

        conv.push(Message::user("12345678"));
        assert_eq!(conv.estimate_tokens(), 6);

        let before = conv.estimate_tokens();
        conv.push(Message::assistant_with_calls(None, vec![call("call_1")]));
        assert!(conv.estimate_tokens() > before + 4);
    }

    #[test]
    fn test_well_formed_pairs_results_in_order() {
        let mut conv = Conversation::new();
        conv.push(Message::user("what time is it"));
        conv.push(Message::assistant_with_calls(None, vec![call("a"), call("b")]));
        conv.push(Message::tool(&ToolResult::success("clock", "12:00").with_id("a")));
        conv.push(Message::tool(&ToolResult::success("clock", "12:00").with_id("b")));
        conv.push(Message::assistant("It is noon."));
        assert!(conv.is_well_formed());
    }

    #[test]
    fn test_well_formed_rejects_out_of_order_results() {
        let mut conv = Conversation::new();
        conv.push(Message::assistant_with_calls(None, vec![call("a"), call("b")]));
        conv.push(Message::tool(&ToolResult::success("clock", "x").with_id("b")));
        assert!(!conv.is_well_formed());
    }

    #[test]
    fn test_well_formed_rejects_user_before_results() {
        let mut conv = Conversation::new();
        conv.push(Message::assistant_with_calls(None, vec![call("a")]));
        conv.push(Message::user("hello?"));
        assert!(!conv.is_well_formed());
    }

    #[test]
    fn test_render_skips_empty_assistant_and_limits() {
        let mut conv = Conversation::new();
        conv.push(Message::user("one"));
        conv.push(Message::assistant_with_calls(None, vec![call("a")]));
        conv.push(Message::tool(&ToolResult::success("clock", "12:00").with_id("a")));
        conv.push(Message::assistant("two"));

        assert_eq!(
            conv.render(10),
            "User: one\nTool (clock): 12:00\nAssistant: two"
        );
        assert_eq!(conv.render(1), "Assistant: two");
    }

    #[test]
    fn test_message_serializes_with_role_tag() {
        let json = serde_json::to_value(Message::user("hi")).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "hi");
    }
}
