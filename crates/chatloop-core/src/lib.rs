//! # chatloop-core
//!
//! Conversational tool-calling loop with a provider-agnostic LLM boundary
//! and an immutable tool registry.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Agent                                 │
//! │  ┌─────────────────────┐  ┌─────────────┐  ┌─────────────┐  │
//! │  │   LlmProvider       │──│  Tool Loop  │──│    Tools    │  │
//! │  │   (decide)          │  │  (advance)  │  │  (execute)  │  │
//! │  └─────────────────────┘  └─────────────┘  └─────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! A turn appends the user message, then alternates between a model call
//! and the execution of every tool the model asked for, until the model
//! answers in plain text.

pub mod error;
pub mod message;
pub mod provider;
pub mod reasoning;
pub mod router;
pub mod session;
pub mod tool;

pub use error::{AgentError, Result};
pub use message::{Conversation, Message, Role};
pub use provider::{Completion, GenerationOptions, LlmProvider};
pub use reasoning::{Agent, AgentBuilder, AgentConfig, TurnObserver, TurnOutcome};
pub use router::{Intent, Route, Router, RoutingDecision};
pub use session::Session;
pub use tool::{
    ParameterSchema, RequestedCall, Tool, ToolArguments, ToolCall, ToolFailure, ToolRegistry,
    ToolResult, ToolSchema,
};
