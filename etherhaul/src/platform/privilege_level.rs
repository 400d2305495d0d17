//! CLI phases and the prompt-identified levels that serve them.

use std::fmt;

use regex::bytes::Regex;
use serde::{Deserialize, Serialize};

/// Coarse CLI mode, independent of what a firmware calls its levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Operational mode. On EH this already accepts `set`.
    Exec,
    Privileged,
    Configuration,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Exec => "exec",
            Phase::Privileged => "privileged",
            Phase::Configuration => "configuration",
        })
    }
}

/// One CLI level, recognized by its prompt.
///
/// Levels form a tree through `parent`: `enter` moves from the parent into
/// this level and `exit` moves back out.
#[derive(Debug, Clone)]
pub struct PrivilegeLevel {
    pub name: String,
    pub phase: Phase,

    /// Matches the end of output when the CLI sits at this level.
    pub pattern: Regex,

    pub parent: Option<String>,
    pub enter: Option<String>,
    pub exit: Option<String>,

    /// Matches the password question `enter` may ask.
    pub secret_prompt: Option<Regex>,

    /// Substrings that rule this level out even when `pattern` matches;
    /// `EH#` and `EH(config)#` both end in `#`.
    pub exclusions: Vec<String>,
}

impl PrivilegeLevel {
    pub fn new(name: impl Into<String>, phase: Phase, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.into(),
            phase,
            pattern: Regex::new(pattern)?,
            parent: None,
            enter: None,
            exit: None,
            secret_prompt: None,
            exclusions: Vec::new(),
        })
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Command sent at the parent level to get here.
    pub fn with_enter(mut self, command: impl Into<String>) -> Self {
        self.enter = Some(command.into());
        self
    }

    /// Command sent here to return to the parent.
    pub fn with_exit(mut self, command: impl Into<String>) -> Self {
        self.exit = Some(command.into());
        self
    }

    pub fn with_secret_prompt(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.secret_prompt = Some(Regex::new(pattern)?);
        Ok(self)
    }

    pub fn with_exclusion(mut self, text: impl Into<String>) -> Self {
        self.exclusions.push(text.into());
        self
    }

    /// Is `prompt` this level's prompt?
    pub fn matches(&self, prompt: &str) -> bool {
        !self.exclusions.iter().any(|x| prompt.contains(x.as_str()))
            && self.pattern.is_match(prompt.as_bytes())
    }
}
