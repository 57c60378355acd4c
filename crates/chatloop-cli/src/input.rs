//! Line input from a pipe, a terminal, or a pipe followed by the terminal

use std::io::{self, IsTerminal};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};

type LineStream = Lines<BufReader<Box<dyn AsyncRead + Send + Unpin>>>;

/// Where a line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Pipe,
    Terminal,
}

pub struct InputReader {
    lines: LineStream,
    source: Source,
    reopen_terminal: bool,
}

impl InputReader {
    /// Read from stdin; when it is piped and `interactive_after_pipe` is set,
    /// continue on the controlling terminal once the pipe is drained
    pub fn from_stdin(interactive_after_pipe: bool) -> Self {
        let source = if io::stdin().is_terminal() {
            Source::Terminal
        } else {
            Source::Pipe
        };
        Self::new(
            Box::new(tokio::io::stdin()),
            source,
            source == Source::Pipe && interactive_after_pipe,
        )
    }

    pub fn new(
        reader: Box<dyn AsyncRead + Send + Unpin>,
        source: Source,
        reopen_terminal: bool,
    ) -> Self {
        Self {
            lines: BufReader::new(reader).lines(),
            source,
            reopen_terminal,
        }
    }

    pub const fn source(&self) -> Source {
        self.source
    }

    /// Next trimmed line, or `None` at end of input
    pub async fn next_line(&mut self) -> io::Result<Option<(String, Source)>> {
        loop {
            if let Some(line) = self.lines.next_line().await? {
                return Ok(Some((line.trim().to_string(), self.source)));
            }

            if !self.reopen_terminal {
                return Ok(None);
            }

            self.reopen_terminal = false;
            let tty = tokio::fs::File::open("/dev/tty").await?;
            tracing::debug!("Piped input drained, switching to terminal");
            self.lines = BufReader::new(Box::new(tty) as Box<dyn AsyncRead + Send + Unpin>).lines();
            self.source = Source::Terminal;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn piped(text: &'static str) -> InputReader {
        InputReader::new(Box::new(text.as_bytes()), Source::Pipe, false)
    }

    #[tokio::test]
    async fn test_reads_trimmed_lines_then_eof() {
        let mut input = piped("  hello \n\n2 + 3 * 4\n");

        assert_eq!(
            input.next_line().await.unwrap(),
            Some(("hello".into(), Source::Pipe))
        );
        assert_eq!(input.next_line().await.unwrap(), Some((String::new(), Source::Pipe)));
        assert_eq!(
            input.next_line().await.unwrap(),
            Some(("2 + 3 * 4".into(), Source::Pipe))
        );
        assert_eq!(input.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_last_line_without_newline() {
        let mut input = piped("quit");
        assert_eq!(input.next_line().await.unwrap().unwrap().0, "quit");
        assert!(input.next_line().await.unwrap().is_none());
    }
}
