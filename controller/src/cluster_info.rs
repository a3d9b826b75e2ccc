//! Runtime information about the nodes of a content cluster.

use std::collections::BTreeMap;

use serde::Deserialize;

use fleetguard_common::{HostInfo, Node, NodeState, NodeType};

/// What the controller knows about a single node.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NodeInfo {
    /// Node identity.
    pub node: Node,
    /// State the node reports about itself.
    #[serde(default = "NodeState::down")]
    pub reported_state: NodeState,
    /// Last persisted wanted state, whatever its origin.
    #[serde(default = "NodeState::up")]
    pub wanted_state: NodeState,
    /// Wanted state set by an operator or external automation.
    #[serde(default = "NodeState::up")]
    pub user_wanted_state: NodeState,
    /// Latest telemetry, possibly stale.
    #[serde(default)]
    pub host_info: HostInfo,
}

impl NodeInfo {
    /// A node that has not reported anything yet.
    pub fn new(node: Node) -> Self {
        Self {
            node,
            reported_state: NodeState::down(),
            wanted_state: NodeState::up(),
            user_wanted_state: NodeState::up(),
            host_info: HostInfo::default(),
        }
    }

    pub fn index(&self) -> u16 {
        self.node.index
    }

    pub fn with_reported_state(mut self, state: impl Into<NodeState>) -> Self {
        self.reported_state = state.into();
        self
    }

    /// Set the user wanted state, which is also the effective wanted state.
    pub fn with_user_wanted_state(mut self, state: impl Into<NodeState>) -> Self {
        self.user_wanted_state = state.into();
        self.wanted_state = self.user_wanted_state.clone();
        self
    }

    pub fn with_host_info(mut self, host_info: HostInfo) -> Self {
        self.host_info = host_info;
        self
    }
}

/// Storage and distributor node information of one cluster, ordered by index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterInfo {
    storage_nodes: BTreeMap<u16, NodeInfo>,
    distributor_nodes: BTreeMap<u16, NodeInfo>,
}

impl ClusterInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a list of node infos. Later entries replace earlier ones for the same node.
    pub fn from_nodes(nodes: impl IntoIterator<Item = NodeInfo>) -> Self {
        let mut info = Self::new();
        for node in nodes {
            info.insert(node);
        }
        info
    }

    /// Add or replace a node.
    pub fn insert(&mut self, node_info: NodeInfo) -> Option<NodeInfo> {
        let index = node_info.index();
        self.nodes_of_mut(node_info.node.node_type)
            .insert(index, node_info)
    }

    pub fn storage_node_info(&self, index: u16) -> Option<&NodeInfo> {
        self.storage_nodes.get(&index)
    }

    pub fn distributor_node_info(&self, index: u16) -> Option<&NodeInfo> {
        self.distributor_nodes.get(&index)
    }

    /// Look up any node.
    pub fn node_info(&self, node: &Node) -> Option<&NodeInfo> {
        match node.node_type {
            NodeType::Storage => self.storage_node_info(node.index),
            NodeType::Distributor => self.distributor_node_info(node.index),
        }
    }

    pub(crate) fn node_info_mut(&mut self, node: &Node) -> Option<&mut NodeInfo> {
        self.nodes_of_mut(node.node_type).get_mut(&node.index)
    }

    pub fn storage_nodes(&self) -> impl Iterator<Item = &NodeInfo> {
        self.storage_nodes.values()
    }

    pub fn distributor_nodes(&self) -> impl Iterator<Item = &NodeInfo> {
        self.distributor_nodes.values()
    }

    /// Storage nodes first, then distributors.
    pub fn all_nodes(&self) -> impl Iterator<Item = &NodeInfo> {
        self.storage_nodes().chain(self.distributor_nodes())
    }

    pub fn storage_node_count(&self) -> usize {
        self.storage_nodes.len()
    }

    pub fn distributor_node_count(&self) -> usize {
        self.distributor_nodes.len()
    }

    fn nodes_of_mut(&mut self, node_type: NodeType) -> &mut BTreeMap<u16, NodeInfo> {
        match node_type {
            NodeType::Storage => &mut self.storage_nodes,
            NodeType::Distributor => &mut self.distributor_nodes,
        }
    }
}
