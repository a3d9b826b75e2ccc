//! Hierarchical grouping of storage nodes.

use serde::{Deserialize, Serialize};

/// A storage node as it appears in the configured topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfiguredNode {
    /// Storage node index.
    pub index: u16,
    /// Whether the node is configured as retired.
    #[serde(default)]
    pub retired: bool,
}

impl ConfiguredNode {
    pub fn new(index: u16) -> Self {
        Self {
            index,
            retired: false,
        }
    }
}

/// A group in the topology tree. Leaf groups hold nodes, inner groups hold subgroups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Index among siblings.
    #[serde(default)]
    pub index: u16,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Nodes directly in this group.
    #[serde(default)]
    pub nodes: Vec<ConfiguredNode>,
    /// Child groups.
    #[serde(default)]
    pub subgroups: Vec<Group>,
}

impl Group {
    /// Create a leaf group holding the given storage node indices.
    pub fn leaf(index: u16, name: impl Into<String>, node_indices: &[u16]) -> Self {
        Self {
            index,
            name: name.into(),
            nodes: node_indices.iter().copied().map(ConfiguredNode::new).collect(),
            subgroups: Vec::new(),
        }
    }

    /// Create an inner group from its children.
    pub fn with_subgroups(index: u16, name: impl Into<String>, subgroups: Vec<Group>) -> Self {
        Self {
            index,
            name: name.into(),
            nodes: Vec::new(),
            subgroups,
        }
    }

    /// Whether this group has no subgroups.
    pub fn is_leaf(&self) -> bool {
        self.subgroups.is_empty()
    }

    /// Whether a storage node index is configured directly in this group.
    pub fn contains_node(&self, index: u16) -> bool {
        self.nodes.iter().any(|n| n.index == index)
    }
}
