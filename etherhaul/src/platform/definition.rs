//! Everything firmware-specific about talking to a radio, as data.

use std::fmt;

use indexmap::IndexMap;
use regex::bytes::Regex;

use super::privilege_level::{Phase, PrivilegeLevel};
use crate::error::PlatformError;

/// `--More--` style marker and what to type to get the next page.
#[derive(Debug, Clone)]
pub struct Pager {
    pub pattern: Regex,
    pub response: String,
}

/// Prompts, error signatures and session housekeeping for one firmware
/// family.
///
/// A firmware release that words its errors differently or grows a new
/// CLI level only needs a different definition, not different code.
#[derive(Clone)]
pub struct PlatformDefinition {
    pub name: String,

    /// Levels in prompt-matching order.
    pub privilege_levels: IndexMap<String, PrivilegeLevel>,

    /// Level the session moves to right after login.
    pub default_privilege: String,

    /// Phase `set` commands are sent from.
    pub config_phase: Phase,

    /// An output line matching any of these means the command was refused.
    pub failure_patterns: Vec<Regex>,

    /// Sent once after login; a refusal is only logged.
    pub pagination_commands: Vec<String>,

    /// Sent before the transport is closed.
    pub logout_commands: Vec<String>,

    /// Answered whenever output stops at the marker.
    pub pager: Option<Pager>,
}

impl PlatformDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            privilege_levels: IndexMap::new(),
            default_privilege: String::new(),
            config_phase: Phase::Configuration,
            failure_patterns: Vec::new(),
            pagination_commands: Vec::new(),
            logout_commands: Vec::new(),
            pager: None,
        }
    }

    pub fn with_privilege(mut self, level: PrivilegeLevel) -> Self {
        self.privilege_levels.insert(level.name.clone(), level);
        self
    }

    pub fn with_default_privilege(mut self, name: impl Into<String>) -> Self {
        self.default_privilege = name.into();
        self
    }

    pub fn with_config_phase(mut self, phase: Phase) -> Self {
        self.config_phase = phase;
        self
    }

    pub fn with_failure_pattern(mut self, pattern: &str) -> Result<Self, PlatformError> {
        self.failure_patterns.push(Regex::new(pattern)?);
        Ok(self)
    }

    pub fn with_pagination_command(mut self, command: impl Into<String>) -> Self {
        self.pagination_commands.push(command.into());
        self
    }

    pub fn with_logout_command(mut self, command: impl Into<String>) -> Self {
        self.logout_commands.push(command.into());
        self
    }

    pub fn with_pager(
        mut self,
        pattern: &str,
        response: impl Into<String>,
    ) -> Result<Self, PlatformError> {
        self.pager = Some(Pager {
            pattern: Regex::new(pattern)?,
            response: response.into(),
        });
        Ok(self)
    }

    /// Check the definition is internally consistent.
    pub fn validate(&self) -> Result<(), PlatformError> {
        if self.privilege_levels.is_empty() {
            return Err(PlatformError::InvalidDefinition {
                message: format!("platform '{}' has no privilege levels", self.name),
            });
        }

        if !self.privilege_levels.contains_key(&self.default_privilege) {
            return Err(PlatformError::InvalidDefinition {
                message: format!(
                    "default privilege '{}' is not defined on platform '{}'",
                    self.default_privilege, self.name
                ),
            });
        }

        for level in self.privilege_levels.values() {
            if let Some(parent) = &level.parent {
                if !self.privilege_levels.contains_key(parent) {
                    return Err(PlatformError::InvalidDefinition {
                        message: format!(
                            "privilege '{}' names unknown parent '{}'",
                            level.name, parent
                        ),
                    });
                }
            }
        }

        Ok(())
    }
}

impl fmt::Debug for PlatformDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformDefinition")
            .field("name", &self.name)
            .field("privilege_levels", &self.privilege_levels.keys())
            .field("default_privilege", &self.default_privilege)
            .field("config_phase", &self.config_phase)
            .field("failure_patterns", &self.failure_patterns.len())
            .field("pagination_commands", &self.pagination_commands)
            .field("logout_commands", &self.logout_commands)
            .field("pager", &self.pager.as_ref().map(|p| p.pattern.as_str()))
            .finish()
    }
}
