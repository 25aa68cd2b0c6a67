//! Whole-tree structural verification.
//!
//! Navigation only checks what a single access touches. [`verify`] walks
//! every node once and checks everything up front, so a verified container
//! can only fail navigation with type, index or key errors:
//!
//! - every node header and payload prefix is in bounds and has a known tag;
//! - every array offset is non-negative and lands inside the buffer;
//! - every string is NUL-terminated inside the buffer;
//! - map keys are strings in strictly ascending byte order (no duplicates);
//! - a map's keys and values arrays both hold exactly `size()` elements;
//! - nesting stays within [`MAX_DEPTH`].

use tracing::debug;

use crate::error::{CorruptionKind, Error, Result};
use crate::format::{NodeType, MAX_DEPTH};
use crate::node::Node;

/// Verifies the tree rooted at `root`.
pub fn verify(root: Node<'_>) -> Result<()> {
    let mut stats = Stats::default();
    walk(root, 0, &mut stats)?;
    debug!(
        nodes = stats.nodes,
        max_depth = stats.max_depth,
        "rodb structure verified"
    );
    Ok(())
}

#[derive(Default)]
struct Stats {
    nodes: usize,
    max_depth: usize,
}

fn walk(node: Node<'_>, depth: usize, stats: &mut Stats) -> Result<()> {
    if depth > MAX_DEPTH {
        return Err(Error::corrupt(
            node.position(),
            CorruptionKind::TooDeep(MAX_DEPTH),
        ));
    }
    stats.nodes += 1;
    stats.max_depth = stats.max_depth.max(depth);

    match node.node_type() {
        NodeType::Bool | NodeType::Int | NodeType::Float => Ok(()),
        NodeType::String => node.as_bytes().map(|_| ()),
        NodeType::Array => {
            for element in node.elements()? {
                walk(element?, depth + 1, stats)?;
            }
            Ok(())
        }
        NodeType::Map => verify_map(node, depth, stats),
    }
}

fn verify_map(map: Node<'_>, depth: usize, stats: &mut Stats) -> Result<()> {
    let keys = map.keys()?;
    let values = map.values()?;
    for section in [keys, values] {
        if section.size() != map.size() {
            return Err(Error::corrupt(
                section.position(),
                CorruptionKind::CountMismatch {
                    expected: map.size(),
                    found: section.size(),
                },
            ));
        }
    }

    let mut previous: Option<&[u8]> = None;
    for (i, key) in keys.elements()?.enumerate() {
        let key = key?;
        if !key.is_string() {
            return Err(Error::corrupt(
                key.position(),
                CorruptionKind::NonStringKey(key.node_type()),
            ));
        }
        let bytes = key.as_bytes()?;
        if previous.is_some_and(|prev| prev >= bytes) {
            return Err(Error::corrupt(
                key.position(),
                CorruptionKind::UnsortedKeys { index: i },
            ));
        }
        previous = Some(bytes);
    }
    // keys and values arrays are nodes too
    stats.nodes += keys.size() + 2;

    for value in values.elements()? {
        walk(value?, depth + 1, stats)?;
    }
    Ok(())
}
