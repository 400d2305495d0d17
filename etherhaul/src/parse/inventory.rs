//! `show inventory`
//!
//! The device lists components flat; `cont-in` names each component's
//! container, with `0` marking the chassis. The tree is rebuilt here.

use std::collections::HashSet;

use indexmap::IndexMap;
use log::debug;
use serde::Serialize;

use super::{Shape, boolean, check_output, normalize, number, records, unrecognized};
use crate::error::ParseError;

/// A hardware component and the components it contains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryNode {
    pub id: u32,
    pub name: Option<String>,
    pub description: Option<String>,
    pub class: Option<String>,
    pub model: Option<String>,
    pub serial: Option<String>,
    pub hw_rev: Option<String>,
    pub fw_rev: Option<String>,
    pub sw_rev: Option<String>,
    pub manufacturer: Option<String>,
    pub fru: Option<bool>,
    pub rel_pos: Option<i32>,
    pub children: Vec<InventoryNode>,
}

impl InventoryNode {
    fn new(id: u32) -> Self {
        Self {
            id,
            name: None,
            description: None,
            class: None,
            model: None,
            serial: None,
            hw_rev: None,
            fw_rev: None,
            sw_rev: None,
            manufacturer: None,
            fru: None,
            rel_pos: None,
            children: Vec::new(),
        }
    }

    /// Number of levels in this subtree; a leaf has depth 1.
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(InventoryNode::depth).max().unwrap_or(0)
    }

    /// Find a component anywhere in this subtree.
    pub fn find(&self, id: u32) -> Option<&InventoryNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    /// Depth-first iteration over this node and all descendants.
    pub fn iter(&self) -> impl Iterator<Item = &InventoryNode> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }
}

/// Parse `show inventory` output into a tree rooted at the chassis.
pub fn parse_inventory(text: &str) -> Result<InventoryNode, ParseError> {
    check_output(Shape::Inventory, text)?;

    let mut nodes: IndexMap<u32, InventoryNode> = IndexMap::new();
    let mut parents: IndexMap<u32, Option<u32>> = IndexMap::new();

    for record in records(text).filter(|r| r.noun == "inventory") {
        let Some(id) = record.numeric_id() else {
            continue;
        };
        let node = nodes.entry(id).or_insert_with(|| InventoryNode::new(id));
        let string = || normalize(record.value).map(str::to_string);

        match record.key {
            "cont-in" => {
                parents.insert(id, number(record.value));
            }
            "name" => node.name = string(),
            "desc" | "description" => node.description = string(),
            "class" => node.class = string(),
            "model-name" => node.model = string(),
            "serial" => node.serial = string(),
            "hw-rev" => node.hw_rev = string(),
            "fw-rev" => node.fw_rev = string(),
            "sw-rev" => node.sw_rev = string(),
            "mfg-name" => node.manufacturer = string(),
            "fru" => node.fru = boolean(record.value),
            "rel-pos" => node.rel_pos = number(record.value),
            _ => {}
        }
    }

    if nodes.is_empty() {
        return Err(unrecognized(Shape::Inventory, text));
    }

    let Some(chassis_id) = parents
        .iter()
        .find(|(_, parent)| **parent == Some(0))
        .map(|(id, _)| *id)
    else {
        return Err(ParseError::new(Shape::Inventory, "no chassis (cont-in 0)", text));
    };

    // Children lists in report order
    let mut children: IndexMap<u32, Vec<u32>> = IndexMap::new();
    for (id, parent) in &parents {
        match parent {
            Some(parent) if *id != chassis_id && *parent != *id => {
                children.entry(*parent).or_default().push(*id);
            }
            _ => {}
        }
    }

    let mut visited = HashSet::new();
    let root = build(chassis_id, &nodes, &children, &mut visited);

    for id in nodes.keys().filter(|id| !visited.contains(*id)) {
        debug!("inventory component {} is not reachable from the chassis; dropped", id);
    }

    root.ok_or_else(|| ParseError::new(Shape::Inventory, "no chassis (cont-in 0)", text))
}

fn build(
    id: u32,
    nodes: &IndexMap<u32, InventoryNode>,
    children: &IndexMap<u32, Vec<u32>>,
    visited: &mut HashSet<u32>,
) -> Option<InventoryNode> {
    if !visited.insert(id) {
        debug!("inventory component {} forms a cycle; dropped", id);
        return None;
    }

    let mut node = nodes.get(&id)?.clone();
    if let Some(ids) = children.get(&id) {
        node.children = ids
            .iter()
            .filter_map(|child| build(*child, nodes, children, visited))
            .collect();
    }

    Some(node)
}
