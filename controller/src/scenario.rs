//! Scenarios: a cluster snapshot plus a sequence of set-node-state requests.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use serde::Deserialize;

use fleetguard_common::{
    ClusterState, Group, HostInfo, MetricValue, MetricValues, Metrics, Node, NodeState, NodeType,
    State, BUCKETS_METRIC_DIMENSIONS, BUCKETS_METRIC_NAME,
};

use crate::checker::CheckResult;
use crate::cluster_info::NodeInfo;
use crate::config::{CheckerConfig, ControllerConfig};
use crate::controller::FleetController;
use crate::registry::TopologyRegistry;
use crate::request::{Condition, SetNodeStateRequest};

/// A scenario evaluated by the `fleetguard` binary.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    #[serde(default)]
    pub name: String,
    /// Controller configuration.
    #[serde(default)]
    pub config: ControllerConfig,
    /// Current cluster state, in the cluster state text format.
    pub cluster_state: ClusterState,
    /// Group topology. Defaults to a single group holding every storage node.
    #[serde(default)]
    pub groups: Option<Group>,
    /// Known nodes.
    pub nodes: Vec<NodeInfo>,
    /// Requests, evaluated in order.
    pub requests: Vec<SetNodeStateRequest>,
}

impl Scenario {
    /// Load a scenario from a JSON file, or one of the built-in scenarios by name.
    pub fn load(name_or_path: &str) -> anyhow::Result<Self> {
        match name_or_path {
            "decommission" => Ok(Self::decommission()),
            "grouped-maintenance" => Ok(Self::grouped_maintenance()),
            path => Self::from_file(Path::new(path)),
        }
    }

    /// Parse a scenario file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        let scenario = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse scenario {}", path.display()))?;
        Ok(scenario)
    }

    /// Build a controller holding this scenario's topology.
    pub fn into_controller(self) -> anyhow::Result<(FleetController, Vec<SetNodeStateRequest>)> {
        let groups = self.groups.unwrap_or_else(|| {
            let indices: Vec<u16> = self
                .nodes
                .iter()
                .filter(|n| n.node.node_type == NodeType::Storage)
                .map(|n| n.index())
                .collect();
            Group::leaf(0, "root", &indices)
        });

        let registry = Arc::new(TopologyRegistry::new(groups));
        registry.publish_cluster_state(self.cluster_state);
        for node in self.nodes {
            registry.register_node(node);
        }

        let controller = FleetController::new(self.config, registry)?;
        Ok((controller, self.requests))
    }

    /// Evaluate all requests in order.
    pub fn run(self) -> anyhow::Result<Vec<(SetNodeStateRequest, CheckResult)>> {
        let (controller, requests) = self.into_controller()?;
        requests
            .into_iter()
            .map(|request| {
                let result = controller.handle_set_node_state(&request)?;
                Ok::<_, anyhow::Error>((request, result))
            })
            .collect()
    }

    /// Ten storage nodes, node 3 retired and empty: taking it down is safe.
    fn decommission() -> Self {
        let nodes = (0..10)
            .map(|index| {
                let buckets = if index == 3 { 0 } else { 1000 };
                storage_node(index, 42, buckets)
            })
            .chain(std::iter::once(distributor_node(0, 42)))
            .collect();

        Self {
            name: "decommission".to_string(),
            config: ControllerConfig {
                checker: CheckerConfig {
                    min_storage_nodes_up: 8,
                    min_ratio_of_storage_nodes_up: 0.9,
                    required_redundancy: 2,
                },
                ..ControllerConfig::default()
            },
            cluster_state: ClusterState::new(42)
                .with_node_count(NodeType::Distributor, 1)
                .with_node_count(NodeType::Storage, 10)
                .with_node_state(Node::storage(3), State::Retired),
            groups: None,
            nodes,
            requests: vec![
                safe_request(4, NodeState::new(State::Down, "decommission")),
                safe_request(3, NodeState::new(State::Down, "decommission")),
                safe_request(3, NodeState::new(State::Down, "decommission")),
            ],
        }
    }

    /// Two racks of three nodes; a rack maintenance window is extended node by node.
    fn grouped_maintenance() -> Self {
        let nodes = (0..6)
            .map(|index| storage_node(index, 10, 500))
            .chain((0..2).map(|index| distributor_node(index, 10)))
            .collect();

        let window = NodeState::new(State::Maintenance, "rack-a kernel upgrade");
        Self {
            name: "grouped-maintenance".to_string(),
            config: ControllerConfig::default(),
            cluster_state: ClusterState::new(10)
                .with_node_count(NodeType::Distributor, 2)
                .with_node_count(NodeType::Storage, 6),
            groups: Some(Group::with_subgroups(
                0,
                "root",
                vec![
                    Group::leaf(0, "rack-a", &[0, 1, 2]),
                    Group::leaf(1, "rack-b", &[3, 4, 5]),
                ],
            )),
            nodes,
            requests: vec![
                safe_request(0, window.clone()),
                safe_request(1, window.clone()),
                safe_request(2, window),
                safe_request(3, NodeState::new(State::Maintenance, "rack-b disk swap")),
            ],
        }
    }
}

fn safe_request(index: u16, state: NodeState) -> SetNodeStateRequest {
    SetNodeStateRequest {
        node: Node::storage(index),
        condition: Condition::Safe,
        new_wanted_state: state,
    }
}

fn storage_node(index: u16, version: u32, buckets: i64) -> NodeInfo {
    let bucket_metric = MetricValue {
        name: BUCKETS_METRIC_NAME.to_string(),
        values: MetricValues {
            last: Some(buckets),
            ..MetricValues::default()
        },
        dimensions: BUCKETS_METRIC_DIMENSIONS
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    };
    NodeInfo::new(Node::storage(index))
        .with_reported_state(State::Up)
        .with_host_info(HostInfo {
            cluster_state_version: Some(version),
            metrics: Metrics {
                values: vec![bucket_metric],
            },
            ..HostInfo::default()
        })
}

fn distributor_node(index: u16, version: u32) -> NodeInfo {
    NodeInfo::new(Node::distributor(index))
        .with_reported_state(State::Up)
        .with_host_info(HostInfo {
            cluster_state_version: Some(version),
            ..HostInfo::default()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::Action;

    fn actions(scenario: Scenario) -> Vec<Action> {
        scenario
            .run()
            .unwrap()
            .into_iter()
            .map(|(_, result)| result.action())
            .collect()
    }

    #[test]
    fn test_decommission_scenario() {
        assert_eq!(
            actions(Scenario::load("decommission").unwrap()),
            vec![Action::Disallowed, Action::MustSetWantedState, Action::AlreadySet]
        );
    }

    #[test]
    fn test_grouped_maintenance_scenario() {
        assert_eq!(
            actions(Scenario::load("grouped-maintenance").unwrap()),
            vec![
                Action::MustSetWantedState,
                Action::MustSetWantedState,
                Action::MustSetWantedState,
                Action::Disallowed,
            ]
        );
    }

    #[test]
    fn test_scenario_from_json() {
        let scenario: Scenario = serde_json::from_str(
            r#"{
                "config": {"checker": {"min_storage_nodes_up": 2}},
                "cluster_state": "version:3 distributor:1 storage:2",
                "nodes": [
                    {"node": {"type": "STORAGE", "index": 0}, "reported_state": {"state": "UP"}},
                    {"node": {"type": "STORAGE", "index": 1}, "reported_state": {"state": "UP"}},
                    {"node": {"type": "DISTRIBUTOR", "index": 0},
                     "host_info": {"cluster-state-version": 3}}
                ],
                "requests": [
                    {"node": {"type": "STORAGE", "index": 1}, "condition": "SAFE",
                     "new_wanted_state": {"state": "MAINTENANCE", "description": "x"}}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(actions(scenario), vec![Action::MustSetWantedState]);
    }

    #[test]
    fn test_built_in_storage_nodes_report_buckets() {
        let node = storage_node(2, 42, 17);
        assert_eq!(node.host_info.bucket_count(), Some(17));
        assert_eq!(node.host_info.cluster_state_version(), Some(42));
    }

    #[test]
    fn test_invalid_scenario_config() {
        let scenario: Scenario = serde_json::from_str(
            r#"{
                "config": {"checker": {"min_ratio_of_storage_nodes_up": 2.0}},
                "cluster_state": "version:1 storage:1",
                "nodes": [],
                "requests": []
            }"#,
        )
        .unwrap();
        assert!(scenario.run().is_err());
    }

    #[test]
    fn test_unknown_scenario_file() {
        assert!(Scenario::load("/nonexistent/scenario.json").is_err());
    }
}
