//! Farewell Tool
//!
//! Lets the model end the chat session when the user says goodbye.

use async_trait::async_trait;
use serde_json::Value;

use chatloop_core::{ParameterSchema, Tool, ToolArguments, ToolFailure, ToolSchema};

pub const END_CHAT_TOOL: &str = "end_chat";

const DEFAULT_REASON: &str = "user request";

/// Lets the model close the conversation when the user says goodbye.
///
/// The tool only produces a farewell line; the caller decides whether a
/// turn that invoked it ends the session.
#[derive(Debug, Default, Clone, Copy)]
pub struct FarewellTool;

#[async_trait]
impl Tool for FarewellTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: END_CHAT_TOOL.into(),
            description: "End the conversation when the user wants to leave".into(),
            parameters: vec![ParameterSchema::optional_string(
                "reason",
                "Why the conversation is ending",
                DEFAULT_REASON,
            )],
            category: Some("session".into()),
        }
    }

    async fn invoke(&self, args: &ToolArguments) -> Result<String, ToolFailure> {
        let reason = args
            .get("reason")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_REASON);

        tracing::info!(reason, "Conversation end requested");
        Ok(format!("Conversation ended. Reason: {reason}. Goodbye!"))
    }
}
