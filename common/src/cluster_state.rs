//! Versioned cluster state snapshots and their text format.
//!
//! The text format is a whitespace separated list of `key:value` tokens, e.g.
//! `version:42 distributor:3 storage:10 .3.s:r .4.s:m .4.m:disk\x20swap`.
//! Node specific tokens (`.<index>.<attribute>:<value>`) apply to the node type
//! named by the most recent `distributor:` or `storage:` token. Nodes below the
//! node count without an explicit state are up, nodes at or above it are down.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::{FleetGuardError, Node, NodeState, NodeType, State};

/// An immutable view of the state the cluster controller assigns to every node.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClusterState {
    version: u32,
    distributor_count: u16,
    storage_count: u16,
    node_states: BTreeMap<Node, NodeState>,
}

impl ClusterState {
    /// Create an empty cluster state with the given version.
    pub fn new(version: u32) -> Self {
        Self {
            version,
            ..Self::default()
        }
    }

    /// Set the number of nodes of a type.
    pub fn with_node_count(mut self, node_type: NodeType, count: u16) -> Self {
        match node_type {
            NodeType::Distributor => self.distributor_count = count,
            NodeType::Storage => self.storage_count = count,
        }
        self
    }

    /// Override the state of a single node.
    pub fn with_node_state(mut self, node: Node, state: impl Into<NodeState>) -> Self {
        self.node_states.insert(node, state.into());
        self
    }

    /// Version of this state.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Number of nodes of the given type covered by this state.
    pub fn node_count(&self, node_type: NodeType) -> u16 {
        match node_type {
            NodeType::Distributor => self.distributor_count,
            NodeType::Storage => self.storage_count,
        }
    }

    /// Effective state of a node. Nodes outside the node count are down.
    pub fn node_state(&self, node: &Node) -> NodeState {
        match self.node_states.get(node) {
            Some(state) => state.clone(),
            None => NodeState::from(self.default_state(node)),
        }
    }

    /// State of a node without an explicit override.
    fn default_state(&self, node: &Node) -> State {
        if node.index < self.node_count(node.node_type) {
            State::Up
        } else {
            State::Down
        }
    }

    fn parse_node_token(
        &mut self,
        node_type: NodeType,
        key: &str,
        value: &str,
    ) -> Result<(), FleetGuardError> {
        let invalid = |message: String| FleetGuardError::InvalidClusterState {
            token: format!("{}:{}", key, value),
            message,
        };

        let (index, attribute) = key[1..]
            .split_once('.')
            .ok_or_else(|| invalid("expected .<index>.<attribute>".to_string()))?;
        let index: u16 = index
            .parse()
            .map_err(|_| invalid(format!("invalid node index '{}'", index)))?;
        let node = Node::new(node_type, index);

        match attribute {
            "s" => {
                let state = State::from_code(value)
                    .ok_or_else(|| invalid(format!("unknown state code '{}'", value)))?;
                self.node_states
                    .entry(node)
                    .and_modify(|existing| existing.state = state)
                    .or_insert_with(|| NodeState::from(state));
            }
            "m" => {
                let description = unescape(value);
                let default_state = self.default_state(&node);
                self.node_states
                    .entry(node)
                    .and_modify(|existing| existing.description = description.clone())
                    .or_insert_with(|| NodeState::new(default_state, description));
            }
            // Disk and capacity attributes are not relevant here.
            _ => {}
        }
        Ok(())
    }
}

impl FromStr for ClusterState {
    type Err = FleetGuardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut state = ClusterState::default();
        let mut scope: Option<NodeType> = None;

        for token in s.split_whitespace() {
            let (key, value) =
                token
                    .split_once(':')
                    .ok_or_else(|| FleetGuardError::InvalidClusterState {
                        token: token.to_string(),
                        message: "expected key:value".to_string(),
                    })?;

            let count = |value: &str| {
                value
                    .parse::<u16>()
                    .map_err(|_| FleetGuardError::InvalidClusterState {
                        token: token.to_string(),
                        message: "invalid node count".to_string(),
                    })
            };

            match key {
                "version" => {
                    state.version =
                        value
                            .parse()
                            .map_err(|_| FleetGuardError::InvalidClusterState {
                                token: token.to_string(),
                                message: "invalid version".to_string(),
                            })?;
                }
                "distributor" => {
                    state.distributor_count = count(value)?;
                    scope = Some(NodeType::Distributor);
                }
                "storage" => {
                    state.storage_count = count(value)?;
                    scope = Some(NodeType::Storage);
                }
                _ if key.starts_with('.') => {
                    let node_type =
                        scope.ok_or_else(|| FleetGuardError::InvalidClusterState {
                            token: token.to_string(),
                            message: "node attribute before any node type".to_string(),
                        })?;
                    state.parse_node_token(node_type, key, value)?;
                }
                _ => {}
            }
        }

        Ok(state)
    }
}

impl fmt::Display for ClusterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "version:{}", self.version)?;
        for node_type in [NodeType::Distributor, NodeType::Storage] {
            let count = self.node_count(node_type);
            let overrides: Vec<_> = self
                .node_states
                .iter()
                .filter(|(node, _)| node.node_type == node_type)
                .collect();
            if count == 0 && overrides.is_empty() {
                continue;
            }
            write!(f, " {}:{}", node_type, count)?;
            for (node, state) in overrides {
                if state.state != self.default_state(node) {
                    write!(f, " .{}.s:{}", node.index, state.state.code())?;
                }
                if !state.description.is_empty() {
                    write!(f, " .{}.m:{}", node.index, escape(&state.description))?;
                }
            }
        }
        Ok(())
    }
}

impl TryFrom<String> for ClusterState {
    type Error = FleetGuardError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ClusterState> for String {
    fn from(state: ClusterState) -> Self {
        state.to_string()
    }
}

fn escape(description: &str) -> String {
    description.replace('\\', "\\\\").replace(' ', "\\x20")
}

fn unescape(description: &str) -> String {
    let mut out = String::with_capacity(description.len());
    let mut rest = description;
    while let Some(pos) = rest.find('\\') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        if let Some(tail) = rest.strip_prefix("\\x20") {
            out.push(' ');
            rest = tail;
        } else if let Some(tail) = rest.strip_prefix("\\\\") {
            out.push('\\');
            rest = tail;
        } else {
            out.push('\\');
            rest = &rest[1..];
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cluster_state() {
        let state: ClusterState = "version:42 bits:16 distributor:2 storage:10 .3.s:r .7.s:m"
            .parse()
            .unwrap();

        assert_eq!(state.version(), 42);
        assert_eq!(state.node_count(NodeType::Distributor), 2);
        assert_eq!(state.node_count(NodeType::Storage), 10);
        assert_eq!(state.node_state(&Node::storage(3)).state, State::Retired);
        assert_eq!(state.node_state(&Node::storage(7)).state, State::Maintenance);
        assert_eq!(state.node_state(&Node::storage(0)).state, State::Up);
        assert_eq!(state.node_state(&Node::distributor(1)).state, State::Up);
    }

    #[test]
    fn test_nodes_outside_count_are_down() {
        let state: ClusterState = "version:3 distributor:1 storage:2".parse().unwrap();
        assert_eq!(state.node_state(&Node::storage(2)).state, State::Down);
        assert_eq!(state.node_state(&Node::distributor(1)).state, State::Down);
    }

    #[test]
    fn test_node_attributes_are_scoped_by_type() {
        let state: ClusterState = "version:1 distributor:3 .1.s:d storage:3 .2.s:i"
            .parse()
            .unwrap();
        assert_eq!(state.node_state(&Node::distributor(1)).state, State::Down);
        assert_eq!(state.node_state(&Node::storage(1)).state, State::Up);
        assert_eq!(state.node_state(&Node::storage(2)).state, State::Initializing);
    }

    #[test]
    fn test_description_roundtrips_through_text() {
        let state = ClusterState::new(7)
            .with_node_count(NodeType::Storage, 4)
            .with_node_state(
                Node::storage(2),
                NodeState::new(State::Maintenance, "disk swap"),
            );

        let text = state.to_string();
        assert_eq!(text, "version:7 storage:4 .2.s:m .2.m:disk\\x20swap");
        assert_eq!(text.parse::<ClusterState>().unwrap(), state);
    }

    #[test]
    fn test_description_only_keeps_default_state() {
        let state: ClusterState = "version:1 storage:2 .1.m:busy .5.m:gone".parse().unwrap();
        assert_eq!(
            state.node_state(&Node::storage(1)),
            NodeState::new(State::Up, "busy")
        );
        assert_eq!(
            state.node_state(&Node::storage(5)),
            NodeState::new(State::Down, "gone")
        );
        assert_eq!(state.to_string(), "version:1 storage:2 .1.m:busy .5.m:gone");
    }

    #[test]
    fn test_invalid_cluster_state() {
        assert!("version:x".parse::<ClusterState>().is_err());
        assert!(".1.s:r".parse::<ClusterState>().is_err());
        assert!("version:1 storage:2 .1.s:q".parse::<ClusterState>().is_err());
        assert!("version:1 storage".parse::<ClusterState>().is_err());
    }

    #[test]
    fn test_cluster_state_serde_as_string() {
        let state: ClusterState =
            serde_json::from_str(r#""version:5 storage:3 .0.s:r""#).unwrap();
        assert_eq!(state.node_state(&Node::storage(0)).state, State::Retired);
        assert_eq!(
            serde_json::to_string(&state).unwrap(),
            r#""version:5 storage:3 .0.s:r""#
        );
    }
}
