use std::io::{self, Write};

use colored::{Color, Colorize};

use chatloop_core::{ToolCall, ToolResult, TurnObserver};

/// Longest tool output echoed in a notice
const NOTICE_PREVIEW_CHARS: usize = 120;

/// Console handles all terminal output with colored formatting
#[derive(Debug, Clone, Copy)]
pub struct Console {
    user_color: Color,
    assistant_color: Color,
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

impl Console {
    pub const fn new() -> Self {
        Self {
            user_color: Color::Cyan,
            assistant_color: Color::Green,
        }
    }

    /// Echo a line that came from piped input
    pub fn print_user(&self, message: &str) {
        println!("{} {}", "User:".color(self.user_color).bold(), message);
    }

    /// Print the final answer, tagged with the tools that produced it
    pub fn print_assistant(&self, message: &str, tools: &[String]) {
        let label = "Assistant:".color(self.assistant_color).bold();
        if tools.is_empty() {
            println!("{label} {}", message.color(self.assistant_color));
        } else {
            println!(
                "{label} {} {}",
                format!("[{}]", tools.join(", ")).magenta().dimmed(),
                message.color(self.assistant_color)
            );
        }
    }

    pub fn print_tool_call(&self, call: &ToolCall) {
        let args = render_arguments(&call.arguments);
        println!("  {} {}({args})", "→".magenta(), call.name.magenta().bold());
    }

    pub fn print_tool_result(&self, result: &ToolResult) {
        let preview = preview(&result.output, NOTICE_PREVIEW_CHARS);
        if result.success {
            println!("  {} {}", "←".bright_black(), preview.bright_black());
        } else {
            println!("  {} {}", "✗".red(), preview.red());
        }
    }

    /// Print a system message (info, stats)
    pub fn print_system(&self, message: &str) {
        println!("{} {}", "System:".yellow().bold(), message);
    }

    pub fn print_error(&self, error: &str) {
        eprintln!("{} {}", "Error:".red().bold(), error);
    }

    pub fn print_prompt(&self) {
        print!("{} ", ">".color(self.user_color).bold());
        io::stdout().flush().ok();
    }

    pub fn print_banner(&self, model: &str, tools: &[&str]) {
        println!("{}", "=".repeat(60).bright_blue());
        println!("{}", format!("  chatloop - {model}").bright_blue().bold());
        println!("{}", "=".repeat(60).bright_blue());
        println!("Tools: {}", tools.join(", "));
        println!("Type your message and press Enter. Type 'exit' or 'quit' to end the session.");
        println!();
    }

    pub fn print_separator(&self) {
        println!("{}", "-".repeat(60).bright_black());
    }
}

fn render_arguments(args: &chatloop_core::ToolArguments) -> String {
    args.iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// First `max` characters of the first line, with an ellipsis when cut
fn preview(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or_default();
    let cut: String = line.chars().take(max).collect();
    if cut.len() < text.len() {
        format!("{cut}...")
    } else {
        cut
    }
}

/// Prints tool traffic as the turn runs
pub struct TraceObserver<'a> {
    console: &'a Console,
}

impl<'a> TraceObserver<'a> {
    pub const fn new(console: &'a Console) -> Self {
        Self { console }
    }
}

impl TurnObserver for TraceObserver<'_> {
    fn on_tool_call(&mut self, call: &ToolCall) {
        self.console.print_tool_call(call);
    }

    fn on_tool_result(&mut self, result: &ToolResult) {
        self.console.print_tool_result(result);
    }
}
