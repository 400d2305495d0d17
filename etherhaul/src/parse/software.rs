//! `show sw`

use serde::Serialize;

use super::{Shape, check_output, unrecognized};
use crate::error::ParseError;

/// One flash bank from the software table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SoftwareBank {
    pub bank: u8,
    pub version: String,
    pub scheduled_to_run: bool,
    /// Whether a startup configuration exists for this bank.
    pub startup_config: bool,
}

/// Running and standby software banks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SoftwareFacts {
    pub running: Option<SoftwareBank>,
    pub standby: Option<SoftwareBank>,
}

fn yes_no(token: &str) -> Option<bool> {
    if token.eq_ignore_ascii_case("yes") {
        Some(true)
    } else if token.eq_ignore_ascii_case("no") {
        Some(false)
    } else {
        None
    }
}

fn exists_missing(token: &str) -> Option<bool> {
    if token.eq_ignore_ascii_case("exists") {
        Some(true)
    } else if token.eq_ignore_ascii_case("missing") {
        Some(false)
    } else {
        None
    }
}

/// A table row: `<bank> <version> <running> <scheduled> <startup-config>`.
fn parse_row(line: &str) -> Option<(bool, SoftwareBank)> {
    let mut tokens = line.split_whitespace();

    let bank = tokens.next()?.parse().ok()?;
    let version = tokens.next()?.to_string();
    let running = yes_no(tokens.next()?)?;
    let scheduled_to_run = yes_no(tokens.next()?)?;
    let startup_config = exists_missing(tokens.next()?)?;

    Some((
        running,
        SoftwareBank {
            bank,
            version,
            scheduled_to_run,
            startup_config,
        },
    ))
}

/// Parse `show sw` output.
pub fn parse_software(text: &str) -> Result<SoftwareFacts, ParseError> {
    check_output(Shape::Software, text)?;

    let mut facts = SoftwareFacts::default();
    let mut seen = false;

    for (running, bank) in text.lines().filter_map(parse_row) {
        seen = true;
        if running {
            facts.running = Some(bank);
        } else {
            facts.standby = Some(bank);
        }
    }

    if !seen {
        return Err(unrecognized(Shape::Software, text));
    }

    Ok(facts)
}
