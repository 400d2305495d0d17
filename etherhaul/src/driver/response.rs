//! What one command produced.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

/// Output of one command, with the echo and trailing prompt removed.
///
/// A command the radio refused still yields a `CommandResult`; its
/// `failure_message` holds the first line that matched one of the
/// platform's error signatures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandResult {
    pub command: String,

    /// Normalized output: no carriage returns, pager markers, echo or prompt.
    pub result: String,

    /// Everything read for this command, as received.
    pub raw_result: String,

    /// The prompt that ended the output, trimmed.
    pub prompt: String,

    pub elapsed: Duration,

    pub failure_message: Option<String>,
}

impl CommandResult {
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
            failure_message: None,
        }
    }

    pub(crate) fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.failure_message = Some(message.into());
        self
    }

    /// The radio did not report an error.
    pub fn is_success(&self) -> bool {
        self.failure_message.is_none()
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.result.lines()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.result.contains(needle)
    }
}

impl fmt::Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.failure_message {
            Some(message) => write!(f, "{}: {}", self.command, message),
            None => f.write_str(&self.result),
        }
    }
}
