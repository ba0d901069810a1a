//! Snapshot tree helpers.

use std::collections::HashMap;

use crate::types::SnapshotNode;

/// Pre-order search of a snapshot forest by id; the first match wins.
///
/// Uses an explicit stack so arbitrarily deep snapshot chains cannot
/// overflow the call stack.
pub fn find<'a>(roots: &'a [SnapshotNode], snapshot_id: &str) -> Option<&'a SnapshotNode> {
    let mut stack: Vec<&SnapshotNode> = roots.iter().rev().collect();
    while let Some(node) = stack.pop() {
        if node.id == snapshot_id {
            return Some(node);
        }
        stack.extend(node.children.iter().rev());
    }
    None
}

/// Snapshot as listed by the REST API: flat, with a parent reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatSnapshot {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub parent: Option<String>,
}

/// Rebuild the tree from a flat listing, keeping listing order among
/// siblings. Entries whose parent is not listed become roots.
pub fn build_tree(flat: Vec<FlatSnapshot>) -> Vec<SnapshotNode> {
    let known: std::collections::HashSet<String> = flat.iter().map(|s| s.id.clone()).collect();
    let mut roots = Vec::new();
    let mut by_parent: HashMap<String, Vec<FlatSnapshot>> = HashMap::new();
    for snapshot in flat {
        match snapshot.parent.clone() {
            Some(parent) if known.contains(&parent) && parent != snapshot.id => {
                by_parent.entry(parent).or_default().push(snapshot)
            }
            _ => roots.push(snapshot),
        }
    }
    roots
        .into_iter()
        .map(|root| attach(root, &mut by_parent))
        .collect()
}

fn attach(snapshot: FlatSnapshot, by_parent: &mut HashMap<String, Vec<FlatSnapshot>>) -> SnapshotNode {
    let children = by_parent.remove(&snapshot.id).unwrap_or_default();
    SnapshotNode {
        children: children
            .into_iter()
            .map(|child| attach(child, by_parent))
            .collect(),
        id: snapshot.id,
        name: snapshot.name,
        description: snapshot.description,
    }
}
