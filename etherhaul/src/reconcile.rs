//! Desired-state reconciliation for IP and route slots.
//!
//! Each [`ConfigItem`] is queried, compared field by field against what the
//! device reports, and only when something differs is a single `set`
//! command issued. The slot is then queried again to confirm the change.

use std::fmt;
use std::net::Ipv4Addr;

use indexmap::IndexMap;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::driver::Driver;
use crate::error::{ParseError, Result, ValidationError};
pub use crate::parse::MAX_PREFIX_LEN;
use crate::parse::{IpTable, RouteTable, Shape, check_output, parse_ip, parse_route, records};

/// Largest VLAN id the device accepts.
pub const MAX_VLAN: u16 = 4094;

/// One piece of desired configuration.
///
/// Deserializes from a `type`-tagged map, e.g.
/// `{"type": "ip", "slot": 3, "address": "192.168.1.100", "prefix_len": 24, "vlan": 0}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ConfigItem {
    /// An address on an IP slot.
    Ip {
        slot: u32,
        #[serde(alias = "ip_address")]
        address: Ipv4Addr,
        prefix_len: u8,
        vlan: u16,
    },
    /// A static route slot.
    Route {
        slot: u32,
        dest: Ipv4Addr,
        prefix_len: u8,
        next_hop: Ipv4Addr,
    },
}

impl ConfigItem {
    pub fn slot(&self) -> u32 {
        match self {
            ConfigItem::Ip { slot, .. } | ConfigItem::Route { slot, .. } => *slot,
        }
    }

    /// The CLI noun for this item's table.
    pub fn noun(&self) -> &'static str {
        match self {
            ConfigItem::Ip { .. } => "ip",
            ConfigItem::Route { .. } => "route",
        }
    }

    /// Command that shows this item's slot.
    pub fn query_command(&self) -> String {
        format!("show {} {}", self.noun(), self.slot())
    }

    /// Command that sets every field of this item's slot.
    pub fn set_command(&self) -> String {
        match self {
            ConfigItem::Ip {
                slot,
                address,
                prefix_len,
                vlan,
            } => format!("set ip {slot} ip-addr {address} prefix-len {prefix_len} vlan {vlan}"),
            ConfigItem::Route {
                slot,
                dest,
                prefix_len,
                next_hop,
            } => format!("set route {slot} dest {dest} prefix-len {prefix_len} next-hop {next_hop}"),
        }
    }

    /// Check the item's values; `index` is its position in the request.
    pub fn validate(&self, index: usize) -> std::result::Result<(), ValidationError> {
        let slot = self.slot();
        if slot < 1 {
            return Err(ValidationError::InvalidSlot { index, slot });
        }

        let prefix_len = match self {
            ConfigItem::Ip { prefix_len, .. } | ConfigItem::Route { prefix_len, .. } => *prefix_len,
        };
        if prefix_len > MAX_PREFIX_LEN {
            return Err(ValidationError::InvalidPrefixLen { index, prefix_len });
        }

        if let ConfigItem::Ip { vlan, .. } = self {
            if *vlan > MAX_VLAN {
                return Err(ValidationError::InvalidVlan { index, vlan: *vlan });
            }
        }

        Ok(())
    }

    /// Compare against the device's output for this item's slot.
    ///
    /// A slot missing from the output, including empty output for a slot
    /// that was never configured, differs in every field. Output that reads
    /// like a device error is still a [`ParseError`].
    pub fn compare(&self, output: &str) -> std::result::Result<Vec<FieldDiff>, ParseError> {
        let absent = !records(output)
            .any(|r| r.noun == self.noun() && r.numeric_id() == Some(self.slot()));
        if absent && !output.trim().is_empty() {
            check_output(self.shape(), output)?;
        }

        let mut diffs = Vec::new();

        match self {
            ConfigItem::Ip {
                slot,
                address,
                prefix_len,
                vlan,
            } => {
                let table = if absent { IpTable::default() } else { parse_ip(output)? };
                let entry = table.get(*slot);
                FieldDiff::check(&mut diffs, "address", address, entry.and_then(|e| e.address.as_ref()));
                FieldDiff::check(&mut diffs, "prefix_len", prefix_len, entry.and_then(|e| e.prefix_len.as_ref()));
                FieldDiff::check(&mut diffs, "vlan", vlan, entry.and_then(|e| e.vlan.as_ref()));
            }
            ConfigItem::Route {
                slot,
                dest,
                prefix_len,
                next_hop,
            } => {
                let table = if absent { RouteTable::default() } else { parse_route(output)? };
                let entry = table.get(*slot);
                FieldDiff::check(&mut diffs, "dest", dest, entry.and_then(|e| e.dest.as_ref()));
                FieldDiff::check(&mut diffs, "prefix_len", prefix_len, entry.and_then(|e| e.prefix_len.as_ref()));
                FieldDiff::check(&mut diffs, "next_hop", next_hop, entry.and_then(|e| e.next_hop.as_ref()));
            }
        }

        Ok(diffs)
    }

    fn shape(&self) -> Shape {
        match self {
            ConfigItem::Ip { .. } => Shape::IpTable,
            ConfigItem::Route { .. } => Shape::RouteTable,
        }
    }
}

impl fmt::Display for ConfigItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigItem::Ip {
                slot,
                address,
                prefix_len,
                vlan,
            } => write!(f, "ip {slot} {address}/{prefix_len} vlan {vlan}"),
            ConfigItem::Route {
                slot,
                dest,
                prefix_len,
                next_hop,
            } => write!(f, "route {slot} {dest}/{prefix_len} via {next_hop}"),
        }
    }
}

/// A field whose observed value differs from the desired one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDiff {
    pub field: &'static str,
    pub expected: String,
    /// `None` when the device did not report the field.
    pub actual: Option<String>,
}

impl FieldDiff {
    fn check<V: PartialEq + ToString>(
        diffs: &mut Vec<FieldDiff>,
        field: &'static str,
        expected: &V,
        actual: Option<&V>,
    ) {
        if actual != Some(expected) {
            diffs.push(FieldDiff {
                field,
                expected: expected.to_string(),
                actual: actual.map(ToString::to_string),
            });
        }
    }
}

impl fmt::Display for FieldDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.actual {
            Some(actual) => write!(f, "{} is {}, want {}", self.field, actual, self.expected),
            None => write!(f, "{} missing, want {}", self.field, self.expected),
        }
    }
}

/// Why an item did not converge.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum VerificationError {
    /// The re-query still differs from the desired state.
    #[error("slot {slot} still differs: {}", join(.differences))]
    Mismatch {
        slot: u32,
        differences: Vec<FieldDiff>,
    },

    /// The device rejected a command.
    #[error("device rejected '{command}': {message}")]
    Rejected { command: String, message: String },

    /// The set command returned without the expected acknowledgement.
    #[error("no acknowledgement for '{command}': {output}")]
    NotAcknowledged { command: String, output: String },

    /// The slot's output could not be parsed.
    #[error("{0}")]
    Unparseable(ParseError),
}

fn join(diffs: &[FieldDiff]) -> String {
    diffs
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result for one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemOutcome {
    /// Position in the request.
    pub index: usize,
    pub item: ConfigItem,
    /// Whether a set command was issued for this item.
    pub changed: bool,
    /// Set commands issued for this item.
    pub commands: Vec<String>,
    pub verification: std::result::Result<(), VerificationError>,
}

impl ItemOutcome {
    fn new(index: usize, item: &ConfigItem) -> Self {
        Self {
            index,
            item: item.clone(),
            changed: false,
            commands: Vec::new(),
            verification: Ok(()),
        }
    }

    pub fn is_verified(&self) -> bool {
        self.verification.is_ok()
    }
}

/// Result of [`apply_config`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyOutcome {
    /// At least one item needed a command.
    pub changed: bool,
    /// Every set command issued, in order.
    pub diff: Vec<String>,
    pub items: Vec<ItemOutcome>,
}

impl ApplyOutcome {
    /// Items that failed verification.
    pub fn failures(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.items.iter().filter(|i| !i.is_verified())
    }
}

/// Did `output` acknowledge `set <noun> <slot>`?
fn acknowledged(output: &str, noun: &str, slot: u32) -> bool {
    let slot = slot.to_string();
    output.lines().any(|line| {
        let words: Vec<String> = line.split_whitespace().map(str::to_ascii_lowercase).collect();
        words
            .windows(4)
            .any(|w| w[0] == "set" && w[1] == "done:" && w[2] == noun && w[3] == slot)
    })
}

/// Query the item's slot and compare it.
async fn observe<D: Driver>(
    driver: &mut D,
    item: &ConfigItem,
) -> Result<std::result::Result<Vec<FieldDiff>, VerificationError>> {
    let command = item.query_command();
    let response = driver.send_command(&command).await?;

    if let Some(message) = response.failure_message {
        return Ok(Err(VerificationError::Rejected { command, message }));
    }

    Ok(item
        .compare(&response.result)
        .map_err(VerificationError::Unparseable))
}

/// Converge the device onto `items`.
///
/// All items are validated before anything is sent. Items are then handled
/// strictly in order, each with at most one set command. Per-item failures
/// are reported in the outcome and never retried; a timeout or transport
/// error aborts the whole call.
pub async fn apply_config<D: Driver>(driver: &mut D, items: &[ConfigItem]) -> Result<ApplyOutcome> {
    for (index, item) in items.iter().enumerate() {
        item.validate(index)?;
    }

    let mut outcome = ApplyOutcome::default();

    for (index, item) in items.iter().enumerate() {
        let mut result = ItemOutcome::new(index, item);

        let diffs = match observe(driver, item).await? {
            Ok(diffs) => diffs,
            Err(e) => {
                warn!("{}: cannot read current state: {}", item, e);
                result.verification = Err(e);
                outcome.items.push(result);
                continue;
            }
        };

        if diffs.is_empty() {
            debug!("{}: already in place", item);
            outcome.items.push(result);
            continue;
        }

        debug!("{}: {}", item, join(&diffs));

        let config_phase = driver.platform().config_phase;
        if driver.current_phase() != Some(config_phase) {
            driver.acquire_phase(config_phase).await?;
        }

        let command = item.set_command();
        result.changed = true;
        result.commands.push(command.clone());
        outcome.changed = true;
        outcome.diff.push(command.clone());

        info!("{}: sending '{}'", item, command);
        let response = driver.send_command(&command).await?;

        result.verification = if let Some(message) = response.failure_message {
            Err(VerificationError::Rejected { command, message })
        } else if !acknowledged(&response.result, item.noun(), item.slot()) {
            Err(VerificationError::NotAcknowledged {
                command,
                output: response.result,
            })
        } else {
            match observe(driver, item).await? {
                Ok(diffs) if diffs.is_empty() => Ok(()),
                Ok(differences) => Err(VerificationError::Mismatch {
                    slot: item.slot(),
                    differences,
                }),
                Err(e) => Err(e),
            }
        };

        if let Err(e) = &result.verification {
            warn!("{}: {}", item, e);
        }
        outcome.items.push(result);
    }

    Ok(outcome)
}

/// A table to read back after applying, e.g. `{"type": "ip", "slot": 3}`.
///
/// Without a slot the whole table is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ShowQuery {
    Ip {
        #[serde(default)]
        slot: Option<u32>,
    },
    Route {
        #[serde(default)]
        slot: Option<u32>,
    },
}

impl ShowQuery {
    fn parts(&self) -> (&'static str, Option<u32>, Shape) {
        match *self {
            ShowQuery::Ip { slot } => ("ip", slot, Shape::IpTable),
            ShowQuery::Route { slot } => ("route", slot, Shape::RouteTable),
        }
    }

    pub fn command(&self) -> String {
        match self.parts() {
            (noun, Some(slot), _) => format!("show {noun} {slot}"),
            (noun, None, _) => format!("show {noun}"),
        }
    }

    /// Report key: `ip_slot_3`, or `ip_all` for the whole table.
    pub fn key(&self) -> String {
        match self.parts() {
            (noun, Some(slot), _) => format!("{noun}_slot_{slot}"),
            (noun, None, _) => format!("{noun}_all"),
        }
    }
}

/// A parsed table from a [`ShowQuery`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ShowTable {
    Ip(IpTable),
    Route(RouteTable),
}

/// Tables read by [`show_tables`], keyed by [`ShowQuery::key`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShowReport {
    pub tables: IndexMap<String, ShowTable>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub errors: IndexMap<String, ParseError>,
}

/// Run each query and parse its table.
///
/// A rejected or unparseable query is recorded in [`ShowReport::errors`]
/// and the rest still run.
pub async fn show_tables<D: Driver>(driver: &mut D, queries: &[ShowQuery]) -> Result<ShowReport> {
    let mut report = ShowReport::default();

    for query in queries {
        let command = query.command();
        let (_, _, shape) = query.parts();
        let response = driver.send_command(&command).await?;

        let table = match response.failure_message {
            Some(message) => Err(ParseError::new(
                shape,
                format!("device rejected '{command}': {message}"),
                response.result,
            )),
            None => match query {
                ShowQuery::Ip { .. } => parse_ip(&response.result).map(ShowTable::Ip),
                ShowQuery::Route { .. } => parse_route(&response.result).map(ShowTable::Route),
            },
        };

        match table {
            Ok(table) => {
                report.tables.insert(query.key(), table);
            }
            Err(e) => {
                warn!("'{}' unavailable: {}", command, e);
                report.errors.insert(query.key(), e);
            }
        }
    }

    Ok(report)
}
