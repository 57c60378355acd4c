//! # chatloop-runtime
//!
//! Runtime providers for chatloop.
//!
//! ## Providers
//!
//! - **OpenAI-compatible** (default): OpenRouter, OpenAI, or any local
//!   server exposing `/chat/completions` with function calling
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chatloop_runtime::{OpenAiCompatProvider, ProviderConfig};
//!
//! let config = ProviderConfig::from_env()?;
//! let agent = AgentBuilder::new()
//!     .generation(config.generation_options())
//!     .provider(Arc::new(OpenAiCompatProvider::from_config(config)?))
//!     .build()?;
//! ```

pub mod config;
pub mod openai;

pub use config::ProviderConfig;
pub use openai::OpenAiCompatProvider;

// Re-export core types for convenience
pub use chatloop_core::{
    Agent, AgentBuilder, AgentError, Conversation, LlmProvider, Message, Result, Session, Tool,
    ToolRegistry,
};
