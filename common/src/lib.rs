//! FleetGuard Common Types
//!
//! This crate contains the cluster model shared by the FleetGuard controller,
//! including node identifiers, node states, versioned cluster states, node
//! telemetry and the group topology.

pub mod identifiers;
pub mod state;
pub mod cluster_state;
pub mod host_info;
pub mod group;
pub mod error;

pub use identifiers::*;
pub use state::*;
pub use cluster_state::*;
pub use host_info::*;
pub use group::*;
pub use error::*;
