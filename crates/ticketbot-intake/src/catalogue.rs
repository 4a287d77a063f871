// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The business → location type → city → location name hierarchy.
//!
//! Parsing is lenient: keys are trimmed, empty keys are dropped, keys that
//! collide after trimming are merged, and non-string leaves are ignored.

use std::collections::BTreeMap;

/// Number of levels in the hierarchy.
pub const CATALOGUE_DEPTH: usize = 4;

/// Field names of the catalogue levels, outermost first.
pub const LEVEL_FIELDS: [&str; CATALOGUE_DEPTH] =
    ["business", "location_type", "city", "location_name"];

/// Catalogue level a preset field maps to, if any.
pub fn level_of(field: &str) -> Option<usize> {
    LEVEL_FIELDS.iter().position(|f| *f == field)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Node {
    children: BTreeMap<String, Node>,
}

impl Node {
    fn merge(&mut self, other: Node) {
        for (key, child) in other.children {
            self.children.entry(key).or_default().merge(child);
        }
    }
}

/// Normalized preset catalogue. Read-only once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalogue {
    root: Node,
}

impl Catalogue {
    /// Build a catalogue from its JSON settings document.
    ///
    /// Inner levels are objects; the innermost level is an array of
    /// location names (an object's keys are accepted too).
    pub fn from_value(value: &serde_json::Value) -> Self {
        Self {
            root: parse_level(value, 0),
        }
    }

    /// Returns `true` if the catalogue has no entries at all.
    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty()
    }

    /// All root-to-leaf paths. A branch that stops early (a city without
    /// locations) yields a shorter path.
    pub fn paths(&self) -> Vec<Vec<&str>> {
        let mut out = Vec::new();
        let mut prefix = Vec::with_capacity(CATALOGUE_DEPTH);
        collect_paths(&self.root, &mut prefix, &mut out);
        out
    }

    /// Render back to the canonical JSON shape.
    pub fn to_value(&self) -> serde_json::Value {
        render(&self.root, 0)
    }
}

fn parse_level(value: &serde_json::Value, depth: usize) -> Node {
    let mut node = Node::default();
    if depth >= CATALOGUE_DEPTH {
        return node;
    }
    match value {
        serde_json::Value::Object(map) => {
            for (key, child) in map {
                let key = key.trim();
                if key.is_empty() {
                    continue;
                }
                node.children
                    .entry(key.to_string())
                    .or_default()
                    .merge(parse_level(child, depth + 1));
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                if let Some(name) = item.as_str().map(str::trim)
                    && !name.is_empty()
                {
                    node.children.entry(name.to_string()).or_default();
                }
            }
        }
        _ => {}
    }
    node
}

fn collect_paths<'a>(node: &'a Node, prefix: &mut Vec<&'a str>, out: &mut Vec<Vec<&'a str>>) {
    for (key, child) in &node.children {
        prefix.push(key.as_str());
        if child.children.is_empty() {
            out.push(prefix.clone());
        } else {
            collect_paths(child, prefix, out);
        }
        prefix.pop();
    }
}

fn render(node: &Node, depth: usize) -> serde_json::Value {
    if depth + 1 == CATALOGUE_DEPTH {
        return serde_json::Value::Array(
            node.children
                .keys()
                .map(|k| serde_json::Value::String(k.clone()))
                .collect(),
        );
    }
    serde_json::Value::Object(
        node.children
            .iter()
            .map(|(k, child)| (k.clone(), render(child, depth + 1)))
            .collect(),
    )
}
