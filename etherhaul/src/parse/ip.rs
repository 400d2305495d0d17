//! `show ip [<slot>]`

use std::net::Ipv4Addr;

use indexmap::IndexMap;
use serde::Serialize;

use super::{Shape, check_output, normalize, number, prefix_len, records, unrecognized};
use crate::error::ParseError;

/// How a slot obtains its address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressMode {
    Static,
    Dhcp,
}

/// One IP slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IpEntry {
    pub slot: u32,
    pub mode: Option<AddressMode>,
    pub address: Option<Ipv4Addr>,
    pub prefix_len: Option<u8>,
    pub vlan: Option<u16>,
    pub default_gateway: Option<Ipv4Addr>,
    pub admin_state: Option<String>,
}

impl IpEntry {
    fn new(slot: u32) -> Self {
        Self {
            slot,
            mode: None,
            address: None,
            prefix_len: None,
            vlan: None,
            default_gateway: None,
            admin_state: None,
        }
    }
}

/// IP slots keyed by slot number, in report order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct IpTable {
    entries: IndexMap<u32, IpEntry>,
}

impl IpTable {
    pub fn get(&self, slot: u32) -> Option<&IpEntry> {
        self.entries.get(&slot)
    }

    pub fn iter(&self) -> impl Iterator<Item = &IpEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `ip-addr` values look like `static 10.0.0.1`, `dhcp` or a bare address.
fn parse_address(value: &str) -> (Option<AddressMode>, Option<Ipv4Addr>) {
    let Some(value) = normalize(value) else {
        return (None, None);
    };

    let mut mode = None;
    let mut address = None;

    for token in value.trim_matches('\'').split_whitespace() {
        if token.eq_ignore_ascii_case("static") {
            mode = Some(AddressMode::Static);
        } else if token.eq_ignore_ascii_case("dhcp") {
            mode = Some(AddressMode::Dhcp);
        } else if address.is_none() {
            address = token.parse().ok();
        }
    }

    (mode, address)
}

/// Parse `show ip` output.
pub fn parse_ip(text: &str) -> Result<IpTable, ParseError> {
    check_output(Shape::IpTable, text)?;

    let mut table = IpTable::default();

    for record in records(text).filter(|r| r.noun == "ip") {
        let Some(slot) = record.numeric_id() else {
            continue;
        };
        let entry = table
            .entries
            .entry(slot)
            .or_insert_with(|| IpEntry::new(slot));

        match record.key {
            "ip-addr" => (entry.mode, entry.address) = parse_address(record.value),
            "prefix-len" => entry.prefix_len = prefix_len(record.value),
            "vlan" => entry.vlan = number(record.value),
            "default-gateway" => entry.default_gateway = number(record.value),
            "admin-state" | "admin" => {
                entry.admin_state = normalize(record.value).map(str::to_string)
            }
            _ => {}
        }
    }

    if table.is_empty() {
        return Err(unrecognized(Shape::IpTable, text));
    }

    Ok(table)
}
