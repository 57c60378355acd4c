//! The interactive session: reads lines, routes them, and runs turns

use chatloop_core::{Agent, Intent, Message, RequestedCall, Router, Session, ToolArguments};
use chatloop_tools::{CLOCK_TOOL, END_CHAT_TOOL};

use crate::args::ChatConfig;
use crate::console::{Console, TraceObserver};
use crate::input::{InputReader, Source};

const FAREWELL: &str = "Goodbye!";

/// What a line of input asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Exit,
    History,
    Skip,
    Message(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        match line.to_lowercase().as_str() {
            "" => Self::Skip,
            "exit" | "quit" => Self::Exit,
            "/history" => Self::History,
            _ => Self::Message(line.to_string()),
        }
    }
}

/// Whether the session keeps reading input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

pub struct Chat {
    agent: Agent,
    router: Option<Router>,
    session: Session,
    console: Console,
    config: ChatConfig,
}

impl Chat {
    pub fn new(agent: Agent, config: ChatConfig) -> Self {
        let generation = &agent.config().generation;
        let router = config.route.then(|| Router::new(generation));
        let session = Session::new(generation.model.clone());

        Self {
            agent,
            router,
            session,
            console: Console::new(),
            config,
        }
    }

    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Read and answer lines until exit, end of input, or `end_chat`
    pub async fn run(&mut self, input: &mut InputReader) -> anyhow::Result<()> {
        tracing::info!(session = %self.session.id, "Session started");

        loop {
            if input.source() == Source::Terminal {
                self.console.print_prompt();
            }

            let Some((line, source)) = input.next_line().await? else {
                break;
            };

            let command = Command::parse(&line);
            if source == Source::Pipe && command != Command::Skip {
                self.console.print_user(&line);
            }

            if self.handle(command).await == Flow::Stop {
                break;
            }
        }

        self.finish();
        Ok(())
    }

    /// Act on one parsed command
    pub async fn handle(&mut self, command: Command) -> Flow {
        match command {
            Command::Skip => Flow::Continue,
            Command::Exit => {
                self.console.print_system(FAREWELL);
                self.session.end();
                Flow::Stop
            }
            Command::History => {
                self.console
                    .print_system(&self.session.render_history(self.config.history_limit));
                Flow::Continue
            }
            Command::Message(text) => self.respond(&text).await,
        }
    }

    async fn respond(&mut self, text: &str) -> Flow {
        if let Some(router) = &self.router {
            let decision = router.route(self.agent.provider().as_ref(), text).await;
            tracing::debug!(intent = %decision.intent(), fallback = decision.is_fallback(), "Routed");

            match decision.intent() {
                Intent::End => {
                    self.console.print_assistant(FAREWELL, &[]);
                    self.session.end();
                    return Flow::Stop;
                }
                Intent::Summary => {
                    match self.agent.summarize(&self.session.conversation).await {
                        Ok(summary) => self.console.print_assistant(&summary, &[]),
                        Err(e) => self.console.print_error(&e.user_message()),
                    }
                    return Flow::Continue;
                }
                Intent::Time => {
                    self.tell_time(text).await;
                    return Flow::Continue;
                }
                Intent::Chat => {}
            }
        }

        let mut observer = TraceObserver::new(&self.console);
        let result = self
            .agent
            .advance_observed(&mut self.session.conversation, text, &mut observer)
            .await;
        self.session.touch();

        match result {
            Ok(outcome) => {
                self.console.print_assistant(&outcome.answer, &outcome.tools_called);
                if outcome.tools_called.iter().any(|t| t == END_CHAT_TOOL) {
                    self.session.end();
                    return Flow::Stop;
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, retryable = e.is_retryable(), "Turn failed");
                self.console.print_error(&e.user_message());
            }
        }

        Flow::Continue
    }

    /// Answer a routed time request from the clock tool without the model
    async fn tell_time(&mut self, text: &str) {
        let call = RequestedCall::new(CLOCK_TOOL, ToolArguments::new().into()).normalize();
        let result = self.agent.tools().dispatch(&call).await;
        self.console.print_tool_result(&result);

        if !result.success {
            self.console.print_error(&result.output);
            return;
        }

        self.session.conversation.push(Message::user(text));
        self.session.conversation.push(Message::assistant(result.output.clone()));
        self.session.touch();
        self.console
            .print_assistant(&result.output, &[CLOCK_TOOL.to_string()]);
    }

    fn finish(&mut self) {
        if self.session.active {
            self.session.end();
        }

        tracing::info!(
            session = %self.session.id,
            messages = self.session.message_count(),
            "Session ended"
        );

        if self.config.debug && self.session.message_count() > 0 {
            self.console.print_separator();
            self.console.print_system(&format!(
                "{} | {} messages | {}s",
                self.session.title(),
                self.session.message_count(),
                self.session.duration().num_seconds()
            ));
        }
    }
}
