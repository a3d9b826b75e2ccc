//! Identifier types for nodes in a content cluster.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::FleetGuardError;

/// Role a node plays in the content cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
    /// Routes client operations and tracks bucket placement.
    Distributor,
    /// Holds bucket data.
    Storage,
}

impl NodeType {
    /// Name used in the cluster state text format and in node identifiers.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Distributor => "distributor",
            NodeType::Storage => "storage",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = FleetGuardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "distributor" => Ok(NodeType::Distributor),
            "storage" => Ok(NodeType::Storage),
            other => Err(FleetGuardError::InvalidNode(format!(
                "unknown node type '{}'",
                other
            ))),
        }
    }
}

/// A node is identified by its type and its index within that type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Node {
    /// Node role.
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Index among nodes of the same type.
    pub index: u16,
}

impl Node {
    /// Create a new node identifier.
    pub fn new(node_type: NodeType, index: u16) -> Self {
        Self { node_type, index }
    }

    /// Storage node with the given index.
    pub fn storage(index: u16) -> Self {
        Self::new(NodeType::Storage, index)
    }

    /// Distributor node with the given index.
    pub fn distributor(index: u16) -> Self {
        Self::new(NodeType::Distributor, index)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node_type, self.index)
    }
}

impl FromStr for Node {
    type Err = FleetGuardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (node_type, index) = s
            .split_once('.')
            .ok_or_else(|| FleetGuardError::InvalidNode(format!("expected <type>.<index>, got '{}'", s)))?;
        let index = index
            .parse()
            .map_err(|_| FleetGuardError::InvalidNode(format!("invalid node index in '{}'", s)))?;
        Ok(Self::new(node_type.parse()?, index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_display() {
        assert_eq!(Node::storage(3).to_string(), "storage.3");
        assert_eq!(Node::distributor(0).to_string(), "distributor.0");
    }

    #[test]
    fn test_node_parse() {
        assert_eq!("storage.12".parse::<Node>().unwrap(), Node::storage(12));
        assert_eq!("distributor.1".parse::<Node>().unwrap(), Node::distributor(1));
        assert!("storage".parse::<Node>().is_err());
        assert!("container.1".parse::<Node>().is_err());
        assert!("storage.x".parse::<Node>().is_err());
    }

    #[test]
    fn test_node_ordering_groups_by_type() {
        let mut nodes = vec![Node::storage(0), Node::distributor(5), Node::distributor(1)];
        nodes.sort();
        assert_eq!(
            nodes,
            vec![Node::distributor(1), Node::distributor(5), Node::storage(0)]
        );
    }
}
