//! Transaction log scanning
//!
//! A transaction's logs are a flat list of lines from every program it
//! touched. [`EventParser`] replays the invocation stack from the runtime's
//! `invoke`/`success`/`failed` lines and only hands event lines to the
//! [`EventCoder`] while this program is the one executing, so events of
//! other programs are never decoded against this schema.

use tracing::trace;

use crate::coder::events::{Event, EventCoder};
use crate::crypto::Pubkey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogLine<'l> {
    /// `Program <id> invoke [<depth>]`
    Invoke(&'l str),
    /// `Program <id> success` or `Program <id> failed: <reason>`
    Exit(&'l str),
    Other,
}

fn classify(line: &str) -> LogLine<'_> {
    let Some(rest) = line.strip_prefix("Program ") else {
        return LogLine::Other;
    };
    let Some((id, tail)) = rest.split_once(' ') else {
        return LogLine::Other;
    };
    // `Program log:`, `Program data:` and `Program return:` carry program output
    if id.ends_with(':') {
        return LogLine::Other;
    }
    if tail.starts_with("invoke [") {
        LogLine::Invoke(id)
    } else if tail == "success" || tail.starts_with("failed") {
        LogLine::Exit(id)
    } else {
        LogLine::Other
    }
}

/// Extracts one program's events from transaction logs
pub struct EventParser<'c> {
    program_id: String,
    coder: &'c EventCoder,
}

impl<'c> EventParser<'c> {
    pub fn new(program_id: &Pubkey, coder: &'c EventCoder) -> Self {
        Self {
            program_id: program_id.to_base58(),
            coder,
        }
    }

    /// Events emitted by this program, in log order
    pub fn parse_logs<S: AsRef<str>>(&self, logs: &[S]) -> Vec<Event> {
        let mut stack: Vec<&str> = Vec::new();
        let mut events = Vec::new();

        for line in logs.iter().map(|s| s.as_ref()) {
            match classify(line) {
                LogLine::Invoke(id) => stack.push(id),
                LogLine::Exit(id) => {
                    if stack.pop() != Some(id) {
                        trace!(program = id, "unbalanced program exit in logs");
                    }
                }
                LogLine::Other => {
                    if stack.last() == Some(&self.program_id.as_str()) {
                        if let Some(event) = self.coder.decode(line) {
                            events.push(event);
                        }
                    }
                }
            }
        }
        events
    }
}
