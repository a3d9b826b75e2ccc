//! Decides whether a wanted state change can be applied without risking
//! redundancy or availability.
//!
//! The checker is a pure function of the snapshots it is given: it never
//! mutates topology, telemetry or cluster state and never blocks. Callers must
//! hand it a cluster state and a [`ClusterInfo`] captured at (about) the same
//! instant, since host info versions are compared against the cluster state
//! version. Refusals are reported as [`Action::Disallowed`] with a reason meant
//! for operators, never as errors.

use std::fmt;
use std::ops::ControlFlow;

use serde::Serialize;
use tracing::debug;

use fleetguard_common::{ClusterState, Group, Node, NodeState, NodeType, State, BUCKETS_METRIC_NAME};

use crate::cluster_info::{ClusterInfo, NodeInfo};
use crate::config::CheckerConfig;
use crate::group_visiting::HierarchicalGroupVisiting;
use crate::request::Condition;

/// What the caller should do with the requested wanted state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// The change is safe, persist the new wanted state.
    MustSetWantedState,
    /// The requested state is already in effect, nothing to do.
    AlreadySet,
    /// The change is refused.
    Disallowed,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::MustSetWantedState => "MUST_SET_WANTED_STATE",
            Action::AlreadySet => "ALREADY_SET",
            Action::Disallowed => "DISALLOWED",
        };
        f.write_str(name)
    }
}

/// Verdict of a transition check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    action: Action,
    reason: String,
}

impl CheckResult {
    pub fn disallowed(reason: impl Into<String>) -> Self {
        Self {
            action: Action::Disallowed,
            reason: reason.into(),
        }
    }

    pub fn allow() -> Self {
        Self {
            action: Action::MustSetWantedState,
            reason: "Preconditions fulfilled and new state different".to_string(),
        }
    }

    pub fn already_set() -> Self {
        Self {
            action: Action::AlreadySet,
            reason: "Basic preconditions fulfilled and new state is already effective".to_string(),
        }
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn setting_wanted_state_is_allowed(&self) -> bool {
        self.action == Action::MustSetWantedState
    }

    pub fn wanted_state_already_set(&self) -> bool {
        self.action == Action::AlreadySet
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl From<Result<(), String>> for CheckResult {
    fn from(gates: Result<(), String>) -> Self {
        match gates {
            Ok(()) => CheckResult::allow(),
            Err(reason) => CheckResult::disallowed(reason),
        }
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "action {}: {}", self.action, self.reason)
    }
}

/// Checks whether the wanted state of a storage node can be changed safely.
///
/// Gates are evaluated in a fixed order and the first failing gate decides the
/// outcome. Gate order matters: the idempotency check in particular must run
/// before anything that depends on live cluster conditions.
pub struct NodeStateChangeChecker<'a, G: HierarchicalGroupVisiting = Group> {
    min_storage_nodes_up: usize,
    min_ratio_of_storage_nodes_up: f64,
    required_redundancy: u32,
    group_visiting: &'a G,
    cluster_info: &'a ClusterInfo,
}

impl<'a, G: HierarchicalGroupVisiting> NodeStateChangeChecker<'a, G> {
    pub fn new(config: &CheckerConfig, group_visiting: &'a G, cluster_info: &'a ClusterInfo) -> Self {
        Self {
            min_storage_nodes_up: config.min_storage_nodes_up,
            min_ratio_of_storage_nodes_up: config.min_ratio_of_storage_nodes_up,
            required_redundancy: config.required_redundancy,
            group_visiting,
            cluster_info,
        }
    }

    /// Judge a transition of `node` from `old_wanted_state` to `new_wanted_state`.
    pub fn evaluate_transition(
        &self,
        node: &Node,
        cluster_state: &ClusterState,
        condition: &Condition,
        old_wanted_state: &NodeState,
        new_wanted_state: &NodeState,
    ) -> CheckResult {
        let result = self.evaluate(node, cluster_state, condition, old_wanted_state, new_wanted_state);
        debug!(
            node = %node,
            condition = %condition,
            new_wanted_state = %new_wanted_state,
            cluster_state_version = cluster_state.version(),
            action = %result.action(),
            reason = %result.reason(),
            "Evaluated node state transition"
        );
        result
    }

    fn evaluate(
        &self,
        node: &Node,
        cluster_state: &ClusterState,
        condition: &Condition,
        old_wanted_state: &NodeState,
        new_wanted_state: &NodeState,
    ) -> CheckResult {
        match condition {
            Condition::Force => return CheckResult::allow(),
            Condition::Safe => {}
            Condition::Unsupported(_) => {
                return CheckResult::disallowed(format!("Condition not implemented: {}", condition));
            }
        }

        if node.node_type != NodeType::Storage {
            return CheckResult::disallowed(format!(
                "Safe-set of node state is only supported for storage nodes! Requested node type: {}",
                node.node_type
            ));
        }

        let Some(node_info) = self.cluster_info.storage_node_info(node.index) else {
            return CheckResult::disallowed(format!("Unknown node {}", node));
        };

        // A client retrying a change it already made must keep getting the
        // same answer, even if the change would be refused if made today.
        if new_wanted_state == old_wanted_state {
            return CheckResult::already_set();
        }

        match new_wanted_state.state {
            State::Up => self.can_set_state_up(node_info, old_wanted_state),
            State::Maintenance => self.can_set_state_maintenance_temporarily(
                node_info,
                cluster_state,
                &new_wanted_state.description,
            ),
            State::Down => self
                .can_set_state_down_permanently(node_info, cluster_state, &new_wanted_state.description)
                .into(),
            _ => CheckResult::disallowed(format!(
                "Destination node state unsupported in safe mode: {}",
                new_wanted_state
            )),
        }
    }

    fn can_set_state_down_permanently(
        &self,
        node_info: &NodeInfo,
        cluster_state: &ClusterState,
        new_description: &str,
    ) -> Result<(), String> {
        check_no_conflicting_wanted_state(node_info, new_description)?;

        let reported_state = node_info.reported_state.state;
        if reported_state != State::Up {
            return Err(format!(
                "Reported state ({}) is not UP, so no bucket data is available",
                reported_state
            ));
        }

        let current_state = cluster_state.node_state(&node_info.node).state;
        if current_state != State::Retired {
            return Err(format!(
                "Only retired nodes are allowed to be set to DOWN in safe mode - is {}",
                current_state
            ));
        }

        self.check_up_thresholds(cluster_state)?;

        let host_info = &node_info.host_info;
        let controller_version = cluster_state.version();
        match host_info.cluster_state_version() {
            Some(version) if version == controller_version => {}
            version => {
                return Err(format!(
                    "Cluster controller at version {} got info for storage node {} at a different version {}",
                    controller_version,
                    node_info.index(),
                    version.map_or_else(|| "(none)".to_string(), |v| v.to_string())
                ));
            }
        }

        let Some(buckets) = host_info.bucket_count() else {
            return Err(format!(
                "Missing last value of the {} metric for storage node {}",
                BUCKETS_METRIC_NAME,
                node_info.index()
            ));
        };

        if buckets > 0 {
            return Err(format!("The storage node manages {} buckets", buckets));
        }

        Ok(())
    }

    fn can_set_state_up(&self, node_info: &NodeInfo, old_wanted_state: &NodeState) -> CheckResult {
        // The description does not matter when going back up.
        if old_wanted_state.state == State::Up {
            return CheckResult::already_set();
        }

        let reported_state = node_info.reported_state.state;
        if reported_state != State::Up {
            return CheckResult::disallowed(format!(
                "Refuse to set wanted state to UP, since the reported state is not UP ({})",
                reported_state
            ));
        }

        CheckResult::allow()
    }

    fn can_set_state_maintenance_temporarily(
        &self,
        node_info: &NodeInfo,
        cluster_state: &ClusterState,
        new_description: &str,
    ) -> CheckResult {
        if let Err(reason) = check_no_conflicting_wanted_state(node_info, new_description) {
            return CheckResult::disallowed(reason);
        }

        match cluster_state.node_state(&node_info.node).state {
            State::Maintenance | State::Down => return CheckResult::allow(),
            _ => {}
        }

        // Joining a maintenance window a sibling already got through the
        // checks below. Those checks are not repeated.
        if self.another_node_in_group_already_allowed(&node_info.node, new_description) {
            return CheckResult::allow();
        }

        self.check_no_node_in_maintenance(cluster_state)
            .and_then(|()| self.check_distributors(&node_info.node, cluster_state.version()))
            .and_then(|()| self.check_up_thresholds(cluster_state))
            .into()
    }

    fn another_node_in_group_already_allowed(&self, node: &Node, new_description: &str) -> bool {
        self.group_visiting
            .visit_leaves(|group| {
                if !group.contains_node(node.index) {
                    return ControlFlow::Continue(());
                }
                ControlFlow::Break(self.another_node_in_leaf_group_already_allowed(
                    group,
                    node,
                    new_description,
                ))
            })
            .unwrap_or(false)
    }

    fn another_node_in_leaf_group_already_allowed(
        &self,
        group: &Group,
        node: &Node,
        new_description: &str,
    ) -> bool {
        group
            .nodes
            .iter()
            .filter(|configured| configured.index != node.index)
            .filter_map(|configured| self.cluster_info.storage_node_info(configured.index))
            .map(|info| &info.user_wanted_state)
            .any(|wanted| wanted.state == State::Maintenance && wanted.description == new_description)
    }

    fn check_no_node_in_maintenance(&self, cluster_state: &ClusterState) -> Result<(), String> {
        for node_info in self.cluster_info.all_nodes() {
            if cluster_state.node_state(&node_info.node).state == State::Maintenance {
                return Err(format!("Another node is already in maintenance: {}", node_info.node));
            }
            if node_info.wanted_state.state == State::Maintenance {
                return Err(format!("Another node wants maintenance: {}", node_info.node));
            }
        }
        Ok(())
    }

    fn storage_nodes_with_available_state(&self, cluster_state: &ClusterState) -> usize {
        (0..cluster_state.node_count(NodeType::Storage))
            .filter(|&index| {
                cluster_state
                    .node_state(&Node::storage(index))
                    .state
                    .is_available()
            })
            .count()
    }

    fn check_up_thresholds(&self, cluster_state: &ClusterState) -> Result<(), String> {
        let nodes_count = self.cluster_info.storage_node_count();
        if nodes_count < self.min_storage_nodes_up {
            return Err(format!(
                "There are only {} storage nodes up, while config requires at least {}",
                nodes_count, self.min_storage_nodes_up
            ));
        }

        if nodes_count == 0 {
            return Err("No storage nodes in cluster state".to_string());
        }

        let up_nodes_count = self.storage_nodes_with_available_state(cluster_state);
        if (up_nodes_count as f64) / (nodes_count as f64) < self.min_ratio_of_storage_nodes_up {
            return Err(format!(
                "Not enough storage nodes running: {} of {} storage nodes are up which is less than the required fraction of {}",
                up_nodes_count, nodes_count, self.min_ratio_of_storage_nodes_up
            ));
        }

        Ok(())
    }

    /// Every distributor must have seen the current cluster state and must not
    /// report too low redundancy for the node.
    fn check_distributors(&self, node: &Node, cluster_state_version: u32) -> Result<(), String> {
        if self.cluster_info.distributor_node_count() == 0 {
            return Err("Not aware of any distributors, probably not safe to upgrade?".to_string());
        }

        for distributor in self.cluster_info.distributor_nodes() {
            match distributor.host_info.cluster_state_version() {
                None => {
                    return Err(format!(
                        "Distributor node ({}) has not reported any cluster state version yet.",
                        distributor.index()
                    ));
                }
                Some(version) if version != cluster_state_version => {
                    return Err(format!(
                        "Distributor node ({}) does not report same version ({}) as fleetcontroller has ({})",
                        distributor.index(),
                        version,
                        cluster_state_version
                    ));
                }
                Some(_) => {}
            }

            // No opinion means few or no buckets, which is fine.
            if let Some(min_replication) = distributor.host_info.min_replication_factor_for(node.index) {
                if min_replication < self.required_redundancy {
                    return Err(format!(
                        "Distributor {} says storage node {} has buckets with redundancy as low as {}, but we require at least {}",
                        distributor.index(),
                        node.index,
                        min_replication,
                        self.required_redundancy
                    ));
                }
            }
        }

        Ok(())
    }
}

/// Refuse to override a wanted state set by someone else. An identical
/// description is assumed to come from the same operator.
fn check_no_conflicting_wanted_state(node_info: &NodeInfo, new_description: &str) -> Result<(), String> {
    let old = &node_info.user_wanted_state;
    if old.state != State::Up && old.description != new_description {
        return Err(format!(
            "A conflicting wanted state is already set: {}: {}",
            old.state, old.description
        ));
    }
    Ok(())
}
