//! Error types for FleetGuard.
//!
//! Refusing a state change is not an error; these cover malformed input and
//! inconsistent bookkeeping only.

use crate::Node;
use thiserror::Error;

/// Main error type for FleetGuard operations.
#[derive(Error, Debug)]
pub enum FleetGuardError {
    /// Cluster state text could not be parsed.
    #[error("Invalid cluster state token '{token}': {message}")]
    InvalidClusterState { token: String, message: String },

    /// Node identifier could not be parsed.
    #[error("Invalid node: {0}")]
    InvalidNode(String),

    /// Host info document could not be parsed.
    #[error("Invalid host info: {0}")]
    InvalidHostInfo(#[from] serde_json::Error),

    /// Node is not part of the topology.
    #[error("Unknown node: {0}")]
    UnknownNode(Node),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl FleetGuardError {
    /// Get error code for operator tooling.
    pub fn error_code(&self) -> &'static str {
        match self {
            FleetGuardError::InvalidClusterState { .. } => "INVALID_CLUSTER_STATE",
            FleetGuardError::InvalidNode(_) => "INVALID_NODE",
            FleetGuardError::InvalidHostInfo(_) => "INVALID_HOST_INFO",
            FleetGuardError::UnknownNode(_) => "UNKNOWN_NODE",
            FleetGuardError::ConfigurationError(_) => "CONFIGURATION_ERROR",
        }
    }
}

/// Result type alias for FleetGuard operations.
pub type Result<T> = std::result::Result<T, FleetGuardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            FleetGuardError::UnknownNode(Node::storage(4)).error_code(),
            "UNKNOWN_NODE"
        );
        let err = FleetGuardError::UnknownNode(Node::storage(4));
        assert_eq!(err.to_string(), "Unknown node: storage.4");
    }
}
