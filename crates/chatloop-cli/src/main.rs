//! chatloop terminal client
//!
//! Reads lines from stdin (piped or interactive), answers each one with a
//! tool-calling turn, and prints tool activity as it happens.

mod args;
mod chat;
mod console;
mod input;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use chatloop_core::{AgentBuilder, LlmProvider};
use chatloop_runtime::{OpenAiCompatProvider, ProviderConfig};

use crate::args::Cli;
use crate::chat::Chat;
use crate::console::Console;
use crate::input::{InputReader, Source};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load environment
    dotenvy::dotenv().ok();
    dotenvy::from_path(".taskfile/.env").ok();

    // Logs go to stderr so piped transcripts stay clean
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.default_log_filter())),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = ProviderConfig::from_env()
        .context("failed to load provider configuration from the environment")?;
    if let Some(model) = &cli.model {
        config = config.with_model(model.clone());
    }
    config.validate().context("invalid provider configuration")?;

    let generation = config.generation_options();
    let provider = Arc::new(OpenAiCompatProvider::from_config(config)?);

    match provider.health_check().await {
        Ok(true) => tracing::info!(model = %generation.model, "Connected to model endpoint"),
        Ok(false) | Err(_) => {
            tracing::warn!("Model endpoint not reachable, turns will fail until it is");
        }
    }

    let tools = chatloop_tools::default_registry()?;
    let agent = AgentBuilder::new()
        .provider(provider)
        .tools(tools)
        .generation(generation)
        .max_rounds(cli.max_rounds)
        .build()
        .context("failed to build agent")?;

    let mut input = InputReader::from_stdin(cli.interactive);
    if input.source() == Source::Terminal {
        let tool_names = agent.tools().names();
        Console::new().print_banner(&agent.config().generation.model, &tool_names);
    }

    let mut chat = Chat::new(agent, cli.chat_config());
    chat.run(&mut input).await
}
