//! Parsers for EtherHaul `show` output.
//!
//! Each parser is a pure function from the normalized text of one command
//! to a typed structure. Fields the device prints malformed degrade to
//! `None`; only text that is not the expected output at all (empty, a
//! device error message, or no line of the expected form) is a
//! [`ParseError`].
//!
//! Most EH output uses one line grammar:
//!
//! ```text
//! <noun> [<id>] <key>   : <value>
//! ```
//!
//! [`records`] tokenizes it; the per-shape modules interpret the keys.

mod config;
mod inventory;
mod ip;
mod rf;
mod rollback;
mod route;
mod software;
mod system;

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::ParseError;

pub use config::{ConfigBody, ConfigLine, LineKind, parse_config};
pub use inventory::{InventoryNode, parse_inventory};
pub use ip::{AddressMode, IpEntry, IpTable, parse_ip};
pub use rf::{OperState, RfMetrics, parse_rf};
pub use rollback::{RollbackStatus, parse_rollback};
pub use route::{RouteEntry, RouteTable, parse_route};
pub use software::{SoftwareBank, SoftwareFacts, parse_software};
pub use system::{SystemFacts, parse_system};

/// The kind of output a parser expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    /// `show system`
    System,
    /// `show sw`
    Software,
    /// `show ip`
    IpTable,
    /// `show route`
    RouteTable,
    /// `show inventory`
    Inventory,
    /// `show rf`
    Rf,
    /// `copy running-configuration display` and friends
    Config,
    /// `show rollback`
    Rollback,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Shape::System => "system",
            Shape::Software => "software",
            Shape::IpTable => "ip table",
            Shape::RouteTable => "route table",
            Shape::Inventory => "inventory",
            Shape::Rf => "rf",
            Shape::Config => "configuration",
            Shape::Rollback => "rollback status",
        };
        f.write_str(name)
    }
}

/// One `<noun> [<id>] <key> : <value>` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record<'a> {
    pub noun: &'a str,
    pub id: Option<&'a str>,
    pub key: &'a str,
    pub value: &'a str,
}

impl Record<'_> {
    /// The id parsed as a number, if present and numeric.
    pub fn numeric_id(&self) -> Option<u32> {
        self.id.and_then(|id| id.parse().ok())
    }
}

/// Iterate the key/value records in `text`.
///
/// Blank lines, `#` comments and lines that do not follow the grammar are
/// skipped. The value is split at the first colon, so values such as
/// times keep their own colons.
pub fn records(text: &str) -> impl Iterator<Item = Record<'_>> {
    text.lines().filter_map(|line| {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        let (head, value) = line.split_once(':')?;
        let mut tokens = head.split_whitespace();
        let noun = tokens.next()?;
        let second = tokens.next()?;

        let (id, key) = match tokens.next() {
            Some(key) => (Some(second), key),
            None => (None, second),
        };
        if tokens.next().is_some() {
            return None;
        }

        Some(Record {
            noun,
            id,
            key,
            value: value.trim(),
        })
    })
}

/// `n/a`, `default` and empty values carry no information.
pub fn normalize(value: &str) -> Option<&str> {
    let value = value.trim();
    if value.is_empty()
        || value.eq_ignore_ascii_case("n/a")
        || value.eq_ignore_ascii_case("default")
    {
        None
    } else {
        Some(value)
    }
}

/// Parse a normalized value, `None` when absent or malformed.
pub fn number<T: FromStr>(value: &str) -> Option<T> {
    normalize(value)?.parse().ok()
}

/// Largest IPv4 prefix length.
pub const MAX_PREFIX_LEN: u8 = 32;

/// A prefix length in `0..=32`, `None` otherwise.
pub fn prefix_len(value: &str) -> Option<u8> {
    number(value).filter(|len| *len <= MAX_PREFIX_LEN)
}

/// `true`/`false` (any case), `None` otherwise.
pub fn boolean(value: &str) -> Option<bool> {
    let value = normalize(value)?;
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Reject text that cannot be output of the expected shape.
///
/// Empty text and text whose first meaningful line reads like a device
/// error are refused before any field is looked at.
pub fn check_output(shape: Shape, text: &str) -> Result<(), ParseError> {
    let Some(first) = text.lines().map(str::trim).find(|l| !l.is_empty()) else {
        return Err(ParseError::new(shape, "empty output", text));
    };

    let lower = first.to_ascii_lowercase();
    let looks_like_error = lower.starts_with('%')
        || lower.starts_with("error")
        || lower.contains("invalid input")
        || lower.contains("unknown command");

    if looks_like_error {
        return Err(ParseError::new(shape, format!("device error: {first}"), text));
    }

    Ok(())
}

/// Error for text with no line of the expected form.
pub(crate) fn unrecognized(shape: Shape, text: &str) -> ParseError {
    ParseError::new(shape, "no recognized lines", text)
}
