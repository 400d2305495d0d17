//! Tracking and navigating the CLI level tree.

use indexmap::IndexMap;
use regex::bytes::Regex;

use crate::error::{Result, SessionError};
use crate::platform::{Phase, PrivilegeLevel};

/// Knows which level the CLI is at and how to get to another one.
///
/// The current level is only ever learned from prompts, never assumed from
/// the commands that were sent.
#[derive(Debug)]
pub struct PrivilegeManager {
    levels: IndexMap<String, PrivilegeLevel>,
    current: Option<String>,
}

/// One hop between adjacent levels.
#[derive(Debug, Clone)]
pub struct Transition {
    pub command: String,

    /// Set when the hop may stop at a password question.
    pub secret_prompt: Option<Regex>,
}

impl PrivilegeManager {
    pub fn new(levels: IndexMap<String, PrivilegeLevel>) -> Self {
        Self {
            levels,
            current: None,
        }
    }

    /// The level whose prompt `prompt` is, checked in definition order.
    pub fn determine_from_prompt(&self, prompt: &str) -> Result<&PrivilegeLevel> {
        self.levels
            .values()
            .find(|level| level.matches(prompt))
            .ok_or_else(|| {
                SessionError::UnknownPrivilege {
                    prompt: prompt.to_string(),
                }
                .into()
            })
    }

    pub fn current(&self) -> Option<&PrivilegeLevel> {
        self.levels.get(self.current.as_deref()?)
    }

    pub fn current_phase(&self) -> Option<Phase> {
        self.current().map(|level| level.phase)
    }

    pub fn set_current(&mut self, name: &str) -> Result<()> {
        if !self.levels.contains_key(name) {
            return Err(SessionError::UnknownPrivilege {
                prompt: name.to_string(),
            }
            .into());
        }
        self.current = Some(name.to_string());
        Ok(())
    }

    /// Move to the level `prompt` belongs to.
    ///
    /// An unrecognized prompt leaves the current level alone and yields `None`.
    pub fn observe_prompt(&mut self, prompt: &str) -> Option<String> {
        let name = self.determine_from_prompt(prompt).ok()?.name.clone();
        self.current = Some(name.clone());
        Some(name)
    }

    /// The first level defined for `phase`.
    pub fn level_for_phase(&self, phase: Phase) -> Result<&str> {
        self.levels
            .values()
            .find(|level| level.phase == phase)
            .map(|level| level.name.as_str())
            .ok_or_else(|| {
                SessionError::NoLevelForPhase {
                    phase: phase.to_string(),
                }
                .into()
            })
    }

    /// `name` followed by its parent, grandparent and so on.
    fn lineage<'a>(&'a self, name: &'a str) -> Vec<&'a str> {
        let mut chain = vec![name];
        let mut node = name;

        while let Some(parent) = self.levels.get(node).and_then(|l| l.parent.as_deref()) {
            // A malformed definition could loop; stop at the first repeat
            if chain.contains(&parent) {
                break;
            }
            chain.push(parent);
            node = parent;
        }

        chain
    }

    /// Levels visited going from `from` to `to`, both included.
    ///
    /// The route climbs from `from` to the closest level both share as an
    /// ancestor, then descends to `to`.
    pub fn path(&self, from: &str, to: &str) -> Result<Vec<String>> {
        let no_path = || SessionError::NoPrivilegePath {
            from: from.to_string(),
            to: to.to_string(),
        };

        if !self.levels.contains_key(from) || !self.levels.contains_key(to) {
            return Err(no_path().into());
        }

        let up = self.lineage(from);
        let down = self.lineage(to);

        let (up_len, down_len) = up
            .iter()
            .enumerate()
            .find_map(|(i, level)| down.iter().position(|d| d == level).map(|j| (i, j)))
            .ok_or_else(no_path)?;

        let mut path: Vec<String> = up[..=up_len].iter().map(|s| s.to_string()).collect();
        path.extend(down[..down_len].iter().rev().map(|s| s.to_string()));
        Ok(path)
    }

    /// How to get from `from` to the adjacent level `to`.
    pub fn transition(&self, from: &str, to: &str) -> Option<Transition> {
        let source = self.levels.get(from)?;
        let target = self.levels.get(to)?;

        if target.parent.as_deref() == Some(from) {
            Some(Transition {
                command: target.enter.clone()?,
                secret_prompt: target.secret_prompt.clone(),
            })
        } else if source.parent.as_deref() == Some(to) {
            Some(Transition {
                command: source.exit.clone()?,
                secret_prompt: None,
            })
        } else {
            None
        }
    }
}
