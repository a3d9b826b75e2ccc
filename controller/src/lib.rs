//! FleetGuard Controller
//!
//! The policy engine that decides whether a requested change to a node's
//! wanted state can be applied without violating the redundancy and
//! availability guarantees of a content cluster. It judges requests against
//! snapshots of the cluster state, node telemetry and group topology; it never
//! applies a change to the cluster itself.

pub mod checker;
pub mod cluster_info;
pub mod config;
pub mod controller;
pub mod group_visiting;
pub mod metrics;
pub mod registry;
pub mod request;
pub mod scenario;

pub use checker::{Action, CheckResult, NodeStateChangeChecker};
pub use cluster_info::{ClusterInfo, NodeInfo};
pub use config::{CheckerConfig, ControllerConfig};
pub use controller::FleetController;
pub use group_visiting::HierarchicalGroupVisiting;
pub use registry::{TopologyRegistry, TopologySnapshot};
pub use request::{Condition, SetNodeStateRequest};
pub use scenario::Scenario;
