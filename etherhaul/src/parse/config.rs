//! Configuration listings (`copy running-configuration display`).
//!
//! The body is kept line by line with each line's exact text and
//! terminator, so writing it back out reproduces the device's bytes.

use std::fmt;

use serde::{Serialize, Serializer};

use super::{Shape, check_output};
use crate::error::ParseError;

/// What a configuration line is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    /// A `set ...` style command.
    Directive,
    /// First non-whitespace character is `#`.
    Comment,
    /// Empty or whitespace only.
    Blank,
}

/// One configuration line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLine {
    pub kind: LineKind,
    /// The line without its terminator.
    pub text: String,
    /// `"\n"`, `"\r\n"`, or empty for a last line without one.
    pub eol: &'static str,
}

impl ConfigLine {
    fn new(raw: &str) -> Self {
        let (text, eol) = if let Some(text) = raw.strip_suffix("\r\n") {
            (text, "\r\n")
        } else if let Some(text) = raw.strip_suffix('\n') {
            (text, "\n")
        } else {
            (raw, "")
        };

        let trimmed = text.trim_start();
        let kind = if trimmed.is_empty() {
            LineKind::Blank
        } else if trimmed.starts_with('#') {
            LineKind::Comment
        } else {
            LineKind::Directive
        };

        Self {
            kind,
            text: text.to_string(),
            eol,
        }
    }
}

/// An ordered configuration body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigBody {
    pub lines: Vec<ConfigLine>,
}

impl ConfigBody {
    /// Directive lines only.
    pub fn directives(&self) -> impl Iterator<Item = &str> {
        self.lines
            .iter()
            .filter(|l| l.kind == LineKind::Directive)
            .map(|l| l.text.as_str())
    }

    /// Directives whose leading words equal `prefix`'s words.
    ///
    /// `find("set ip 1")` matches `set ip 1  ip-addr ...` but not `set ip 10 ...`.
    pub fn find<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.directives().filter(move |line| {
            let mut words = line.split_whitespace();
            prefix
                .split_whitespace()
                .all(|expected| words.next() == Some(expected))
        })
    }

    /// Software version from the `Generated by ver. X` header, if present.
    pub fn generator_version(&self) -> Option<&str> {
        self.lines
            .iter()
            .filter(|l| l.kind == LineKind::Comment)
            .find_map(|l| {
                let (_, rest) = l.text.split_once("Generated by ver.")?;
                rest.split(',').next().map(str::trim).filter(|v| !v.is_empty())
            })
    }
}

impl fmt::Display for ConfigBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            f.write_str(&line.text)?;
            f.write_str(line.eol)?;
        }
        Ok(())
    }
}

impl Serialize for ConfigBody {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Parse a configuration listing.
pub fn parse_config(text: &str) -> Result<ConfigBody, ParseError> {
    check_output(Shape::Config, text)?;

    Ok(ConfigBody {
        lines: text.split_inclusive('\n').map(ConfigLine::new).collect(),
    })
}
