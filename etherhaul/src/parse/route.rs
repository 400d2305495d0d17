//! `show route [<slot>]`

use std::net::Ipv4Addr;

use indexmap::IndexMap;
use serde::Serialize;

use super::{Shape, check_output, number, prefix_len, records, unrecognized};
use crate::error::ParseError;

/// One static route slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteEntry {
    pub slot: u32,
    pub dest: Option<Ipv4Addr>,
    pub prefix_len: Option<u8>,
    pub next_hop: Option<Ipv4Addr>,
}

/// Route slots keyed by slot number, in report order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RouteTable {
    entries: IndexMap<u32, RouteEntry>,
}

impl RouteTable {
    pub fn get(&self, slot: u32) -> Option<&RouteEntry> {
        self.entries.get(&slot)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse `show route` output.
pub fn parse_route(text: &str) -> Result<RouteTable, ParseError> {
    check_output(Shape::RouteTable, text)?;

    let mut table = RouteTable::default();

    for record in records(text).filter(|r| r.noun == "route") {
        let Some(slot) = record.numeric_id() else {
            continue;
        };
        let entry = table.entries.entry(slot).or_insert(RouteEntry {
            slot,
            dest: None,
            prefix_len: None,
            next_hop: None,
        });

        match record.key {
            "dest" => entry.dest = number(record.value),
            "prefix-len" => entry.prefix_len = prefix_len(record.value),
            "next-hop" => entry.next_hop = number(record.value),
            _ => {}
        }
    }

    if table.is_empty() {
        return Err(unrecognized(Shape::RouteTable, text));
    }

    Ok(table)
}
