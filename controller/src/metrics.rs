//! Metrics collection for state change decisions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::checker::{Action, CheckResult};

/// Decision metrics.
pub struct Metrics {
    /// Total transitions evaluated.
    pub evaluations_total: AtomicU64,
    /// Transitions allowed.
    pub evaluations_allowed: AtomicU64,
    /// Transitions already in effect.
    pub evaluations_already_set: AtomicU64,
    /// Transitions refused.
    pub evaluations_disallowed: AtomicU64,
    /// Transitions requested with the FORCE condition.
    pub evaluations_forced: AtomicU64,
    /// Wanted states recorded after an allowed transition.
    pub wanted_states_set: AtomicU64,
}

impl Metrics {
    /// Create new metrics instance.
    pub fn new() -> Self {
        Self {
            evaluations_total: AtomicU64::new(0),
            evaluations_allowed: AtomicU64::new(0),
            evaluations_already_set: AtomicU64::new(0),
            evaluations_disallowed: AtomicU64::new(0),
            evaluations_forced: AtomicU64::new(0),
            wanted_states_set: AtomicU64::new(0),
        }
    }

    /// Record the outcome of an evaluation.
    pub fn evaluation(&self, result: &CheckResult, forced: bool) {
        self.evaluations_total.fetch_add(1, Ordering::Relaxed);
        if forced {
            self.evaluations_forced.fetch_add(1, Ordering::Relaxed);
        }
        let counter = match result.action() {
            Action::MustSetWantedState => &self.evaluations_allowed,
            Action::AlreadySet => &self.evaluations_already_set,
            Action::Disallowed => &self.evaluations_disallowed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a wanted state being set.
    pub fn wanted_state_set(&self) {
        self.wanted_states_set.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            evaluations_total: self.evaluations_total.load(Ordering::Relaxed),
            evaluations_allowed: self.evaluations_allowed.load(Ordering::Relaxed),
            evaluations_already_set: self.evaluations_already_set.load(Ordering::Relaxed),
            evaluations_disallowed: self.evaluations_disallowed.load(Ordering::Relaxed),
            evaluations_forced: self.evaluations_forced.load(Ordering::Relaxed),
            wanted_states_set: self.wanted_states_set.load(Ordering::Relaxed),
        }
    }

    /// Export metrics in Prometheus format.
    pub fn to_prometheus(&self) -> String {
        let snapshot = self.snapshot();
        format!(
            r#"# HELP fleetguard_evaluations_total Total node state transitions evaluated
# TYPE fleetguard_evaluations_total counter
fleetguard_evaluations_total {}

# HELP fleetguard_evaluations_allowed Transitions allowed
# TYPE fleetguard_evaluations_allowed counter
fleetguard_evaluations_allowed {}

# HELP fleetguard_evaluations_already_set Transitions already in effect
# TYPE fleetguard_evaluations_already_set counter
fleetguard_evaluations_already_set {}

# HELP fleetguard_evaluations_disallowed Transitions refused
# TYPE fleetguard_evaluations_disallowed counter
fleetguard_evaluations_disallowed {}

# HELP fleetguard_evaluations_forced Transitions requested with the FORCE condition
# TYPE fleetguard_evaluations_forced counter
fleetguard_evaluations_forced {}

# HELP fleetguard_wanted_states_set Wanted states recorded
# TYPE fleetguard_wanted_states_set counter
fleetguard_wanted_states_set {}
"#,
            snapshot.evaluations_total,
            snapshot.evaluations_allowed,
            snapshot.evaluations_already_set,
            snapshot.evaluations_disallowed,
            snapshot.evaluations_forced,
            snapshot.wanted_states_set,
        )
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub evaluations_total: u64,
    pub evaluations_allowed: u64,
    pub evaluations_already_set: u64,
    pub evaluations_disallowed: u64,
    pub evaluations_forced: u64,
    pub wanted_states_set: u64,
}

/// Shared metrics instance.
pub type SharedMetrics = Arc<Metrics>;
