//! Entry point for wanted state change requests.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, instrument, warn};

use fleetguard_common::{FleetGuardError, NodeState, Result};

use crate::checker::{CheckResult, NodeStateChangeChecker};
use crate::config::ControllerConfig;
use crate::metrics::{Metrics, SharedMetrics};
use crate::registry::TopologyRegistry;
use crate::request::{Condition, SetNodeStateRequest};

/// Evaluates set-node-state requests against the current topology and records
/// the wanted states that were allowed.
///
/// Requests are decided one at a time: the snapshot, the evaluation and the
/// recording of an allowed wanted state happen under one decision lock, so a
/// decision always sees every wanted state allowed before it.
pub struct FleetController {
    /// Configuration.
    config: ControllerConfig,
    /// Runtime view of the cluster.
    registry: Arc<TopologyRegistry>,
    /// Decision metrics.
    metrics: SharedMetrics,
    /// Serializes decisions.
    decision_lock: Mutex<()>,
}

impl FleetController {
    /// Create a new controller over a registry. Fails on an invalid configuration.
    pub fn new(config: ControllerConfig, registry: Arc<TopologyRegistry>) -> Result<Self> {
        config.validate().map_err(FleetGuardError::ConfigurationError)?;

        Ok(Self {
            config,
            registry,
            metrics: Arc::new(Metrics::new()),
            decision_lock: Mutex::new(()),
        })
    }

    /// Handle a request to change the wanted state of a node.
    ///
    /// The old wanted state is always the recorded user wanted state of the
    /// node (UP for unknown nodes). Errors are only returned when an allowed
    /// wanted state could not be recorded; refusals are part of the returned
    /// [`CheckResult`].
    #[instrument(skip(self, request), fields(cluster = %self.config.cluster_name, node = %request.node))]
    pub fn handle_set_node_state(&self, request: &SetNodeStateRequest) -> Result<CheckResult> {
        let _decision = self.decision_lock.lock();
        let snapshot = self.registry.snapshot();

        let old_wanted_state = snapshot
            .cluster_info
            .node_info(&request.node)
            .map(|info| info.user_wanted_state.clone())
            .unwrap_or_else(NodeState::up);

        let checker = NodeStateChangeChecker::new(
            &self.config.checker,
            snapshot.groups.as_ref(),
            &snapshot.cluster_info,
        );
        let result = checker.evaluate_transition(
            &request.node,
            &snapshot.cluster_state,
            &request.condition,
            &old_wanted_state,
            &request.new_wanted_state,
        );

        self.metrics
            .evaluation(&result, request.condition == Condition::Force);

        if result.setting_wanted_state_is_allowed() {
            self.registry
                .set_user_wanted_state(&request.node, request.new_wanted_state.clone())?;
            self.metrics.wanted_state_set();
            info!(
                condition = %request.condition,
                old_wanted_state = %old_wanted_state,
                new_wanted_state = %request.new_wanted_state,
                "Wanted state set"
            );
        } else if result.wanted_state_already_set() {
            info!(
                new_wanted_state = %request.new_wanted_state,
                "Wanted state already in effect"
            );
        } else {
            warn!(
                condition = %request.condition,
                new_wanted_state = %request.new_wanted_state,
                reason = %result.reason(),
                "Wanted state change disallowed"
            );
        }

        Ok(result)
    }

    /// Get the registry.
    pub fn registry(&self) -> &Arc<TopologyRegistry> {
        &self.registry
    }

    /// Get the decision metrics.
    pub fn metrics(&self) -> &SharedMetrics {
        &self.metrics
    }

    /// Get the configuration.
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }
}
