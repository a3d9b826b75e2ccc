//! In-memory topology registry.
//!
//! The telemetry collector and the state broadcaster update the registry as
//! information arrives; checks work on [`TopologySnapshot`]s taken under a
//! single lock so the cluster state version and the host info versions they
//! compare always come from the same view.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use fleetguard_common::{ClusterState, FleetGuardError, Group, HostInfo, Node, NodeState, Result};

use crate::cluster_info::{ClusterInfo, NodeInfo};

/// A consistent, immutable view of cluster state, node information and topology.
#[derive(Debug, Clone)]
pub struct TopologySnapshot {
    pub cluster_state: Arc<ClusterState>,
    pub cluster_info: Arc<ClusterInfo>,
    pub groups: Arc<Group>,
}

#[derive(Debug, Default)]
struct Inner {
    cluster_state: Arc<ClusterState>,
    cluster_info: Arc<ClusterInfo>,
    groups: Arc<Group>,
}

/// Registry of the runtime view of one content cluster.
#[derive(Debug, Default)]
pub struct TopologyRegistry {
    inner: RwLock<Inner>,
}

impl TopologyRegistry {
    /// Create a registry for the given group topology.
    pub fn new(groups: Group) -> Self {
        Self {
            inner: RwLock::new(Inner {
                groups: Arc::new(groups),
                ..Inner::default()
            }),
        }
    }

    /// Take a consistent snapshot.
    pub fn snapshot(&self) -> TopologySnapshot {
        let inner = self.inner.read();
        TopologySnapshot {
            cluster_state: inner.cluster_state.clone(),
            cluster_info: inner.cluster_info.clone(),
            groups: inner.groups.clone(),
        }
    }

    /// Replace the current cluster state. Older versions than the current are ignored.
    pub fn publish_cluster_state(&self, cluster_state: ClusterState) -> bool {
        let mut inner = self.inner.write();
        if cluster_state.version() < inner.cluster_state.version() {
            debug!(
                version = cluster_state.version(),
                current = inner.cluster_state.version(),
                "Ignoring outdated cluster state"
            );
            return false;
        }
        info!(version = cluster_state.version(), state = %cluster_state, "Cluster state published");
        inner.cluster_state = Arc::new(cluster_state);
        true
    }

    /// Replace the group topology.
    pub fn set_groups(&self, groups: Group) {
        self.inner.write().groups = Arc::new(groups);
    }

    /// Add or replace a node.
    pub fn register_node(&self, node_info: NodeInfo) {
        let node = node_info.node;
        Arc::make_mut(&mut self.inner.write().cluster_info).insert(node_info);
        info!(node = %node, "Node registered");
    }

    pub fn set_reported_state(&self, node: &Node, state: NodeState) -> Result<()> {
        self.update_node(node, |info| info.reported_state = state)
    }

    pub fn set_wanted_state(&self, node: &Node, state: NodeState) -> Result<()> {
        self.update_node(node, |info| info.wanted_state = state)
    }

    /// Record a wanted state set by an operator. It also becomes the effective wanted state.
    pub fn set_user_wanted_state(&self, node: &Node, state: NodeState) -> Result<()> {
        self.update_node(node, |info| {
            info.wanted_state = state.clone();
            info.user_wanted_state = state;
        })
    }

    /// Record the latest telemetry of a node.
    pub fn record_host_info(&self, node: &Node, mut host_info: HostInfo) -> Result<()> {
        host_info.received_at = Some(chrono::Utc::now());
        self.update_node(node, |info| info.host_info = host_info)
    }

    /// Parse and record a raw host info document.
    pub fn record_host_info_json(&self, node: &Node, json: &str) -> Result<()> {
        self.record_host_info(node, HostInfo::from_json(json)?)
    }

    fn update_node(&self, node: &Node, update: impl FnOnce(&mut NodeInfo)) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.cluster_info.node_info(node).is_none() {
            return Err(FleetGuardError::UnknownNode(*node));
        }
        let info = Arc::make_mut(&mut inner.cluster_info)
            .node_info_mut(node)
            .ok_or(FleetGuardError::UnknownNode(*node))?;
        update(info);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetguard_common::{NodeType, State};

    fn registry() -> TopologyRegistry {
        let registry = TopologyRegistry::new(Group::leaf(0, "flat", &[0, 1]));
        registry.register_node(NodeInfo::new(Node::storage(0)));
        registry.register_node(NodeInfo::new(Node::storage(1)));
        registry.register_node(NodeInfo::new(Node::distributor(0)));
        registry
    }

    #[test]
    fn test_snapshot_is_not_affected_by_later_updates() {
        let registry = registry();
        registry.publish_cluster_state(ClusterState::new(1).with_node_count(NodeType::Storage, 2));
        let before = registry.snapshot();

        registry.publish_cluster_state(ClusterState::new(2).with_node_count(NodeType::Storage, 2));
        registry
            .set_reported_state(&Node::storage(0), NodeState::up())
            .unwrap();

        assert_eq!(before.cluster_state.version(), 1);
        assert_eq!(
            before.cluster_info.storage_node_info(0).unwrap().reported_state.state,
            State::Down
        );

        let after = registry.snapshot();
        assert_eq!(after.cluster_state.version(), 2);
        assert_eq!(
            after.cluster_info.storage_node_info(0).unwrap().reported_state.state,
            State::Up
        );
    }

    #[test]
    fn test_outdated_cluster_state_is_ignored() {
        let registry = registry();
        assert!(registry.publish_cluster_state(ClusterState::new(5)));
        assert!(!registry.publish_cluster_state(ClusterState::new(4)));
        assert_eq!(registry.snapshot().cluster_state.version(), 5);
    }

    #[test]
    fn test_record_host_info_json() {
        let registry = registry();
        registry
            .record_host_info_json(&Node::distributor(0), r#"{"cluster-state-version": 3}"#)
            .unwrap();

        let snapshot = registry.snapshot();
        let info = snapshot.cluster_info.distributor_node_info(0).unwrap();
        assert_eq!(info.host_info.cluster_state_version(), Some(3));
        assert!(info.host_info.received_at.is_some());
    }

    #[test]
    fn test_update_unknown_node() {
        let registry = registry();
        let err = registry
            .set_wanted_state(&Node::storage(9), NodeState::down())
            .unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_NODE");

        let err = registry
            .record_host_info_json(&Node::storage(0), "not json")
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_HOST_INFO");
    }

    #[test]
    fn test_set_groups() {
        let registry = registry();
        let before = registry.snapshot();
        registry.set_groups(Group::with_subgroups(
            0,
            "root",
            vec![Group::leaf(0, "rack-a", &[0]), Group::leaf(1, "rack-b", &[1])],
        ));

        assert!(before.groups.is_leaf());
        let after = registry.snapshot();
        assert_eq!(after.groups.subgroups.len(), 2);
        assert!(after.groups.subgroups[1].contains_node(1));
    }

    #[test]
    fn test_user_wanted_state_sets_wanted_state() {
        let registry = registry();
        let state = NodeState::new(State::Maintenance, "reboot");
        registry
            .set_user_wanted_state(&Node::storage(1), state.clone())
            .unwrap();

        let snapshot = registry.snapshot();
        let info = snapshot.cluster_info.storage_node_info(1).unwrap();
        assert_eq!(info.user_wanted_state, state);
        assert_eq!(info.wanted_state, state);
    }
}
