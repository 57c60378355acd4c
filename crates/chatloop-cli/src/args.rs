//! Command-line arguments

use clap::Parser;

use chatloop_core::reasoning::DEFAULT_MAX_ROUNDS;

/// Messages shown by the `/history` command
pub const HISTORY_LIMIT: usize = 10;

#[derive(Parser, Debug, Clone)]
#[command(name = "chatloop")]
#[command(about = "Terminal chat with an LLM that can call tools")]
#[command(
    long_about = r#"Terminal chat with an LLM that can call tools

USAGE:
  chatloop                          # Interactive chat
  echo "2 + 3 * 4" | chatloop       # Answer piped lines and exit
  echo "hi" | chatloop -i           # Piped lines, then keep chatting
  chatloop --route                  # Classify each line before answering

Type 'exit' or 'quit' to leave, '/history' to show recent messages."#
)]
#[command(version)]
pub struct Cli {
    /// Model identifier, overrides OPENROUTER_MODEL
    #[arg(short, long)]
    pub model: Option<String>,

    /// Maximum model calls per user turn
    #[arg(long, default_value_t = DEFAULT_MAX_ROUNDS)]
    pub max_rounds: usize,

    /// Route each line by intent (chat, time, summary, end) first
    #[arg(long)]
    pub route: bool,

    /// Verbose logging on stderr and session stats on exit
    #[arg(short, long)]
    pub debug: bool,

    /// Continue on the terminal after piped input runs out
    #[arg(short, long)]
    pub interactive: bool,
}

impl Cli {
    pub fn chat_config(&self) -> ChatConfig {
        ChatConfig {
            route: self.route,
            debug: self.debug,
            interactive_after_pipe: self.interactive,
            history_limit: HISTORY_LIMIT,
        }
    }

    /// Filter directive used when `RUST_LOG` is unset
    pub const fn default_log_filter(&self) -> &'static str {
        if self.debug { "debug" } else { "warn" }
    }
}

/// Front-end behavior for one chat session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    pub route: bool,
    pub debug: bool,
    pub interactive_after_pipe: bool,
    pub history_limit: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            route: false,
            debug: false,
            interactive_after_pipe: false,
            history_limit: HISTORY_LIMIT,
        }
    }
}
