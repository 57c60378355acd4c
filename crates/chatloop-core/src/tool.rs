//! Tool System
//!
//! Tools are registered once at startup into an immutable registry and
//! invoked by the reasoning loop.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use crate::error::{AgentError, Result};

/// Argument mapping passed to a tool
pub type ToolArguments = serde_json::Map<String, Value>;

/// Tool invocation as emitted by a provider, before normalization
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RequestedCall {
    /// Correlation id (some providers omit it)
    #[serde(default)]
    pub id: Option<String>,

    /// Tool identifier
    pub name: String,

    /// Raw arguments; anything other than an object is malformed
    #[serde(default)]
    pub arguments: Option<Value>,
}

impl RequestedCall {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: None,
            name: name.into(),
            arguments: Some(arguments),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Repair into a [`ToolCall`]
    ///
    /// Missing or non-object arguments become an empty mapping and a missing
    /// id becomes a fresh UUID. The turn never fails on a malformed call.
    pub fn normalize(self) -> ToolCall {
        let arguments = match self.arguments {
            Some(Value::Object(map)) => map,
            Some(Value::Null) | None => {
                tracing::warn!(
                    error = %AgentError::MalformedInvocation(format!("'{}' has no arguments", self.name)),
                    "Substituting empty arguments"
                );
                ToolArguments::new()
            }
            Some(other) => {
                tracing::warn!(
                    error = %AgentError::MalformedInvocation(format!(
                        "'{}' arguments are not an object: {other}",
                        self.name
                    )),
                    "Substituting empty arguments"
                );
                ToolArguments::new()
            }
        };

        let id = self
            .id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        ToolCall {
            id,
            name: self.name,
            arguments,
        }
    }
}

/// Normalized tool invocation stored in the conversation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Correlation id
    pub id: String,

    /// Tool identifier
    pub name: String,

    /// Arguments as key-value pairs
    #[serde(default)]
    pub arguments: ToolArguments,
}

/// Result from tool execution
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolResult {
    /// Tool that was called
    pub name: String,

    /// Correlation id of the answered call
    pub id: String,

    /// Whether execution succeeded
    pub success: bool,

    /// Output (success text or error description)
    pub output: String,
}

impl ToolResult {
    pub fn success(name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: String::new(),
            success: true,
            output: output.into(),
        }
    }

    pub fn failure(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: String::new(),
            success: false,
            output: error.into(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

/// Failure declared by a tool
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolFailure {
    #[error("Missing required parameter: {0}")]
    MissingArgument(String),

    #[error("Invalid value for '{name}': {reason}")]
    InvalidArgument { name: String, reason: String },

    #[error("{0}")]
    Execution(String),
}

impl From<ToolFailure> for AgentError {
    fn from(failure: ToolFailure) -> Self {
        match failure {
            ToolFailure::Execution(msg) => Self::ToolExecution(msg),
            other => Self::ToolValidation(other.to_string()),
        }
    }
}

/// Parameter definition for tool schema
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name
    pub name: String,

    /// JSON Schema type (string, number, boolean, object, array)
    #[serde(rename = "type")]
    pub param_type: String,

    /// Human-readable description
    pub description: String,

    /// Whether this parameter is required
    #[serde(default)]
    pub required: bool,

    /// Default value if not provided
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Enum of allowed values
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
}

impl ParameterSchema {
    /// Required string parameter
    pub fn required_string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type: "string".into(),
            description: description.into(),
            required: true,
            default: None,
            enum_values: None,
        }
    }

    /// Optional string parameter with a default
    pub fn optional_string(
        name: impl Into<String>,
        description: impl Into<String>,
        default: &str,
    ) -> Self {
        Self {
            name: name.into(),
            param_type: "string".into(),
            description: description.into(),
            required: false,
            default: Some(Value::String(default.into())),
            enum_values: None,
        }
    }

    pub fn with_enum<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = Some(values.into_iter().map(|v| Value::String(v.into())).collect());
        self
    }
}

/// Tool definition schema (for LLM function calling)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to LLM)
    pub description: String,

    /// Parameter definitions
    pub parameters: Vec<ParameterSchema>,

    /// Category for grouping
    #[serde(default)]
    pub category: Option<String>,
}

impl ToolSchema {
    /// JSON Schema object describing the parameters
    pub fn json_schema(&self) -> Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();

        for param in &self.parameters {
            let mut prop = serde_json::Map::new();
            prop.insert("type".into(), Value::String(param.param_type.clone()));
            prop.insert("description".into(), Value::String(param.description.clone()));
            if let Some(default) = &param.default {
                prop.insert("default".into(), default.clone());
            }
            if let Some(values) = &param.enum_values {
                prop.insert("enum".into(), Value::Array(values.clone()));
            }
            properties.insert(param.name.clone(), Value::Object(prop));

            if param.required {
                required.push(Value::String(param.name.clone()));
            }
        }

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// Tool trait - implement to add new capabilities
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool's schema for LLM function calling
    fn schema(&self) -> ToolSchema;

    /// Run the tool with validated arguments
    async fn invoke(&self, args: &ToolArguments) -> std::result::Result<String, ToolFailure>;

    /// Validate arguments before execution (optional)
    fn validate(&self, args: &ToolArguments) -> std::result::Result<(), ToolFailure> {
        let schema = self.schema();

        for param in &schema.parameters {
            if param.required && !args.contains_key(&param.name) {
                return Err(ToolFailure::MissingArgument(param.name.clone()));
            }
        }

        Ok(())
    }
}

/// Immutable registry of available tools
///
/// Built once through [`ToolRegistryBuilder`]; there is no way to add or
/// remove tools afterwards.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

impl ToolRegistry {
    pub fn builder() -> ToolRegistryBuilder {
        ToolRegistryBuilder::default()
    }

    /// Registry with no tools
    pub fn empty() -> Self {
        Self::default()
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Execute a tool call, surfacing lookup, validation and execution errors
    pub async fn execute(&self, call: &ToolCall) -> Result<String> {
        let tool = self
            .get(&call.name)
            .ok_or_else(|| AgentError::ToolNotFound(call.name.clone()))?;

        tool.validate(&call.arguments)?;

        Ok(tool.invoke(&call.arguments).await?)
    }

    /// Execute a tool call and fold any error into the result text
    pub async fn dispatch(&self, call: &ToolCall) -> ToolResult {
        let result = match self.execute(call).await {
            Ok(output) => ToolResult::success(&call.name, output),
            Err(AgentError::ToolNotFound(name)) => {
                tracing::warn!(tool = %name, "Model requested an unknown tool");
                ToolResult::failure(&call.name, format!("Unknown tool: {name}"))
            }
            Err(e) => {
                tracing::debug!(tool = %call.name, error = %e, "Tool failed");
                ToolResult::failure(&call.name, format!("Error: {e}"))
            }
        };

        result.with_id(&call.id)
    }

    /// Get all tool schemas, ordered by name
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.values().map(|t| t.schema()).collect()
    }

    /// Get tool names
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Collects tools before freezing them into a [`ToolRegistry`]
#[derive(Default)]
pub struct ToolRegistryBuilder {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistryBuilder {
    /// Register a new tool
    #[must_use]
    pub fn register<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    /// Freeze the registry, rejecting duplicate names
    pub fn build(self) -> Result<ToolRegistry> {
        let mut tools = BTreeMap::new();

        for tool in self.tools {
            let name = tool.schema().name;
            if tools.insert(name.clone(), tool).is_some() {
                return Err(AgentError::Config(format!("Duplicate tool name: {name}")));
            }
        }

        Ok(ToolRegistry { tools })
    }
}
