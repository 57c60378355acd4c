//! Reasoning Loop
//!
//! Drives one user turn to completion: the model decides, requested tools
//! run, their results go back into the history, and the model is asked
//! again until it answers in plain text or the round bound is hit.

use std::sync::Arc;

use crate::error::{AgentError, Result};
use crate::message::{Conversation, Message};
use crate::provider::{GenerationOptions, LlmProvider};
use crate::tool::{RequestedCall, ToolCall, ToolRegistry, ToolResult};

/// Rounds allowed per turn unless configured otherwise
pub const DEFAULT_MAX_ROUNDS: usize = 5;

/// Messages included when asking for a summary
const SUMMARY_WINDOW: usize = 12;

const DEFAULT_SYSTEM_PROMPT: &str = r"You are a helpful assistant.

You can call tools to get live information or to run an operation. Call a tool when the question needs one:
- use get_current_time when the user asks what time or date it is
- use calculator for any arithmetic
- use end_chat when the user wants to finish the conversation

For general conversation or reasoning over what you already know, answer directly.
If a tool reports an error, explain it or try again with corrected arguments.
Keep answers short and friendly.";

const DEFAULT_EXHAUSTED_REPLY: &str =
    "Sorry, too many tool calls were needed. Please simplify your question.";

const SUMMARY_PROMPT: &str = "You summarize conversations. In 2-3 sentences, state the main questions and conclusions. Be concise and do not add new information.";

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// System prompt sent with every model call
    pub system_prompt: String,

    /// Maximum model rounds per turn before giving up
    pub max_rounds: usize,

    /// Generation options
    pub generation: GenerationOptions,

    /// Answer returned when the round bound is exceeded
    pub exhausted_reply: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            max_rounds: DEFAULT_MAX_ROUNDS,
            generation: GenerationOptions::default(),
            exhausted_reply: DEFAULT_EXHAUSTED_REPLY.into(),
        }
    }
}

/// What one call to [`Agent::advance`] produced
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnOutcome {
    /// Final answer text shown to the user
    pub answer: String,

    /// Model calls made during the turn
    pub rounds: usize,

    /// Tools that ran successfully, in call order
    pub tools_called: Vec<String>,

    /// Whether the round bound cut the turn short
    pub exhausted: bool,
}

/// Receives intermediate notices while a turn runs
pub trait TurnObserver: Send {
    fn on_tool_call(&mut self, _call: &ToolCall) {}

    fn on_tool_result(&mut self, _result: &ToolResult) {}
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl TurnObserver for Silent {}

/// The main Agent struct
pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    config: AgentConfig,
}

impl Agent {
    /// Create a new agent
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        config: AgentConfig,
    ) -> Self {
        Self {
            provider,
            tools,
            config,
        }
    }

    /// Create with default configuration
    pub fn with_defaults(provider: Arc<dyn LlmProvider>, tools: Arc<ToolRegistry>) -> Self {
        Self::new(provider, tools, AgentConfig::default())
    }

    fn generation_options(&self) -> GenerationOptions {
        self.config
            .generation
            .clone()
            .with_system_prompt(self.config.system_prompt.clone())
    }

    /// Run one user turn
    pub async fn advance(
        &self,
        conversation: &mut Conversation,
        user_text: &str,
    ) -> Result<TurnOutcome> {
        self.advance_observed(conversation, user_text, &mut Silent)
            .await
    }

    /// Run one user turn, reporting tool traffic to `observer`
    ///
    /// On a provider error the conversation keeps the new user message and
    /// nothing else from this turn.
    pub async fn advance_observed(
        &self,
        conversation: &mut Conversation,
        user_text: &str,
        observer: &mut dyn TurnObserver,
    ) -> Result<TurnOutcome> {
        let text = user_text.trim();
        if text.is_empty() {
            return Err(AgentError::EmptyInput);
        }

        conversation.push(Message::user(text));
        let committed = conversation.len();
        let mut staged = conversation.clone();

        let options = self.generation_options();
        let schemas = self.tools.schemas();
        let mut tools_called = Vec::new();

        for round in 1..=self.config.max_rounds {
            tracing::debug!(
                round,
                messages = staged.len(),
                tokens = staged.estimate_tokens(),
                "Calling model"
            );

            let completion = self
                .provider
                .complete(staged.messages(), &schemas, &options)
                .await
                .inspect_err(|e| tracing::warn!(round, error = %e, "Model call failed"))?;

            if !completion.has_tool_calls() {
                let answer = completion.content.clone().unwrap_or_default();
                staged.push(Message::assistant_with_calls(completion.content, Vec::new()));
                conversation.commit_from(staged, committed);

                tracing::info!(rounds = round, tools = tools_called.len(), "Turn complete");
                return Ok(TurnOutcome {
                    answer,
                    rounds: round,
                    tools_called,
                    exhausted: false,
                });
            }

            let calls: Vec<ToolCall> = completion
                .tool_calls
                .into_iter()
                .map(RequestedCall::normalize)
                .collect();
            staged.push(Message::assistant_with_calls(
                completion.content,
                calls.clone(),
            ));

            for call in &calls {
                tracing::debug!(tool = %call.name, id = %call.id, "Executing tool");
                observer.on_tool_call(call);

                let result = self.tools.dispatch(call).await;
                observer.on_tool_result(&result);

                if result.success {
                    tools_called.push(call.name.clone());
                }
                staged.push(Message::tool(&result));
            }
        }

        tracing::warn!(max_rounds = self.config.max_rounds, "Round bound reached");
        conversation.commit_from(staged, committed);

        Ok(TurnOutcome {
            answer: self.config.exhausted_reply.clone(),
            rounds: self.config.max_rounds,
            tools_called,
            exhausted: true,
        })
    }

    /// Run with a simple string input (creates temporary conversation)
    pub async fn ask(&self, question: &str) -> Result<String> {
        let mut conversation = Conversation::new();
        let outcome = self.advance(&mut conversation, question).await?;
        Ok(outcome.answer)
    }

    /// Summarize the recent part of a conversation in a few sentences
    pub async fn summarize(&self, conversation: &Conversation) -> Result<String> {
        if conversation.is_empty() {
            return Ok("There is nothing to summarize yet.".into());
        }

        let request = [Message::user(format!(
            "Conversation excerpt:\n{}",
            conversation.render(SUMMARY_WINDOW)
        ))];
        let options = self
            .config
            .generation
            .clone()
            .with_system_prompt(SUMMARY_PROMPT);

        let completion = self.provider.complete(&request, &[], &options).await?;
        Ok(completion.content.unwrap_or_default())
    }

    /// Get the tool registry
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Get the provider
    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    /// Get configuration
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }
}

/// Builder for Agent configuration
pub struct AgentBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    tools: Option<ToolRegistry>,
    config: AgentConfig,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            tools: None,
            config: AgentConfig::default(),
        }
    }

    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    #[must_use]
    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = Some(tools);
        self
    }

    #[must_use]
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    #[must_use]
    pub fn generation(mut self, options: GenerationOptions) -> Self {
        self.config.generation = options;
        self
    }

    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.generation.model = model.into();
        self
    }

    #[must_use]
    pub const fn temperature(mut self, temp: f32) -> Self {
        self.config.generation.temperature = temp;
        self
    }

    #[must_use]
    pub const fn max_rounds(mut self, max: usize) -> Self {
        self.config.max_rounds = max;
        self
    }

    #[must_use]
    pub fn exhausted_reply(mut self, reply: impl Into<String>) -> Self {
        self.config.exhausted_reply = reply.into();
        self
    }

    pub fn build(self) -> Result<Agent> {
        let provider = self
            .provider
            .ok_or_else(|| AgentError::Config("Provider is required".into()))?;

        if self.config.max_rounds == 0 {
            return Err(AgentError::Config("max_rounds must be at least 1".into()));
        }

        Ok(Agent::new(
            provider,
            Arc::new(self.tools.unwrap_or_default()),
            self.config,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Completion;
    use crate::tool::ToolSchema;
    use async_trait::async_trait;

    struct Fixed(&'static str);

    #[async_trait]
    impl LlmProvider for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        async fn complete(
            &self,
            messages: &[Message],
            tools: &[ToolSchema],
            options: &GenerationOptions,
        ) -> Result<Completion> {
            assert!(tools.is_empty());
            assert!(options.system_prompt.is_some());
            assert_eq!(messages.len(), 1);
            Ok(Completion::text(self.0))
        }
    }

    #[test]
    fn test_builder_requires_provider() {
        assert!(matches!(AgentBuilder::new().build(), Err(AgentError::Config(_))));
    }

    #[test]
    fn test_builder_rejects_zero_rounds() {
        let result = AgentBuilder::new()
            .provider(Arc::new(Fixed("x")))
            .max_rounds(0)
            .build();
        assert!(matches!(result, Err(AgentError::Config(_))));
    }

    #[tokio::test]
    async fn test_ask_uses_fresh_conversation() {
        let agent = AgentBuilder::new()
            .provider(Arc::new(Fixed("hello")))
            .build()
            .unwrap();
        assert_eq!(agent.ask("hi").await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_empty_input_leaves_conversation_untouched() {
        let agent = Agent::with_defaults(Arc::new(Fixed("x")), Arc::new(ToolRegistry::empty()));
        let mut conversation = Conversation::new();
        let err = agent.advance(&mut conversation, "   ").await.unwrap_err();
        assert!(matches!(err, AgentError::EmptyInput));
        assert!(conversation.is_empty());
    }

    #[tokio::test]
    async fn test_summarize_empty_skips_model() {
        struct Unreachable;

        #[async_trait]
        impl LlmProvider for Unreachable {
            fn name(&self) -> &str {
                "unreachable"
            }

            async fn health_check(&self) -> Result<bool> {
                Ok(false)
            }

            async fn complete(
                &self,
                _: &[Message],
                _: &[ToolSchema],
                _: &GenerationOptions,
            ) -> Result<Completion> {
                Err(AgentError::ModelUnavailable("offline".into()))
            }
        }

        let agent = Agent::with_defaults(Arc::new(Unreachable), Arc::new(ToolRegistry::empty()));
        let summary = agent.summarize(&Conversation::new()).await.unwrap();
        assert!(summary.contains("nothing to summarize"));
    }

    #[tokio::test]
    async fn test_summarize_sends_rendered_history() {
        let agent = Agent::with_defaults(Arc::new(Fixed("short summary")), Arc::new(ToolRegistry::empty()));
        let mut conversation = Conversation::new();
        conversation.push(Message::user("hi"));
        conversation.push(Message::assistant("hello"));
        assert_eq!(agent.summarize(&conversation).await.unwrap(), "short summary");
    }
}
