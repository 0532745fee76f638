//! What a command exchange produced.

use std::time::Duration;

/// One command's output, as returned by the `send_*` methods.
#[derive(Debug, Clone)]
pub struct Response {
    /// The command that was executed.
    pub command: String,

    /// The command output (command echo and trailing prompt removed, unless
    /// the caller asked to keep them).
    pub result: String,

    /// The output as read, ANSI-stripped but otherwise untouched.
    pub raw_result: String,

    /// The prompt that terminated the read, if one was matched.
    pub prompt: String,

    /// Time from write to the end of the read.
    pub elapsed: Duration,
}

impl Response {
    pub fn new(
        command: impl Into<String>,
        result: impl Into<String>,
        raw_result: impl Into<String>,
        prompt: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            command: command.into(),
            result: result.into(),
            raw_result: raw_result.into(),
            prompt: prompt.into(),
            elapsed,
        }
    }

    /// Lines of the cleaned output.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.result.lines()
    }

    /// Whether the cleaned output mentions `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.result.contains(needle)
    }

    /// True when the device printed nothing besides the echo and prompt.
    pub fn is_empty(&self) -> bool {
        self.result.trim().is_empty()
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.result)
    }
}
