//! Calculator Tool
//!
//! Evaluates arithmetic text and answers `"<expr> = <value>"`.

use async_trait::async_trait;
use serde_json::Value;

use chatloop_core::{ParameterSchema, Tool, ToolArguments, ToolFailure, ToolSchema};

use crate::expr::{evaluate, format_value};

pub const CALCULATOR_TOOL: &str = "calculator";

/// Longest expression accepted, in characters
const MAX_EXPRESSION_CHARS: usize = 1024;

/// Tool for evaluating mathematical expressions
#[derive(Debug, Default, Clone, Copy)]
pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: CALCULATOR_TOOL.into(),
            description: "Evaluate a mathematical expression. Supports + - * / % ^, parentheses, sqrt, sin, cos, tan, log, ln, abs, pi and e.".into(),
            parameters: vec![ParameterSchema::required_string(
                "expression",
                "Expression to evaluate (e.g., '2 + 2', '10 * 5 + 3', 'sqrt(2)')",
            )],
            category: Some("math".into()),
        }
    }

    async fn invoke(&self, args: &ToolArguments) -> Result<String, ToolFailure> {
        let expr = match args.get("expression") {
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                return Err(ToolFailure::InvalidArgument {
                    name: "expression".into(),
                    reason: "expected a string".into(),
                });
            }
        };

        if expr.chars().count() > MAX_EXPRESSION_CHARS {
            return Err(ToolFailure::InvalidArgument {
                name: "expression".into(),
                reason: format!("longer than {MAX_EXPRESSION_CHARS} characters"),
            });
        }

        let value = evaluate(&expr)
            .map_err(|e| ToolFailure::Execution(format!("cannot evaluate '{expr}': {e}")))?;

        tracing::debug!(%expr, value, "Calculated");
        Ok(format!("{expr} = {}", format_value(value)))
    }
}
