//! Node states as reported by nodes, wanted by operators and assigned by the cluster state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum State {
    /// Node is serving.
    Up,
    /// Node is out of service.
    Down,
    /// Node is temporarily out of service, its data is kept.
    Maintenance,
    /// Node still serves, but is being drained of buckets.
    Retired,
    /// Node is starting and catching up.
    Initializing,
    /// Node is shutting down.
    Stopping,
}

impl State {
    /// One-letter code used in the cluster state text format.
    pub fn code(&self) -> char {
        match self {
            State::Up => 'u',
            State::Down => 'd',
            State::Maintenance => 'm',
            State::Retired => 'r',
            State::Initializing => 'i',
            State::Stopping => 's',
        }
    }

    /// Parse a one-letter state code.
    pub fn from_code(code: &str) -> Option<State> {
        match code {
            "u" => Some(State::Up),
            "d" => Some(State::Down),
            "m" => Some(State::Maintenance),
            "r" => Some(State::Retired),
            "i" => Some(State::Initializing),
            "s" => Some(State::Stopping),
            _ => None,
        }
    }

    /// Whether a storage node in this state still counts as available capacity.
    pub fn is_available(&self) -> bool {
        matches!(self, State::Up | State::Retired | State::Initializing)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            State::Up => "UP",
            State::Down => "DOWN",
            State::Maintenance => "MAINTENANCE",
            State::Retired => "RETIRED",
            State::Initializing => "INITIALIZING",
            State::Stopping => "STOPPING",
        };
        f.write_str(name)
    }
}

/// A state together with the free-text description supplied by whoever set it.
///
/// Two node states are equal only when both state and description match; the
/// description is how requests from the same actor are recognized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeState {
    /// The state.
    pub state: State,
    /// Operator supplied annotation, empty when none was given.
    #[serde(default)]
    pub description: String,
}

impl NodeState {
    /// Create a node state with a description.
    pub fn new(state: State, description: impl Into<String>) -> Self {
        Self {
            state,
            description: description.into(),
        }
    }

    /// UP without description.
    pub fn up() -> Self {
        Self::from(State::Up)
    }

    /// DOWN without description.
    pub fn down() -> Self {
        Self::from(State::Down)
    }

    /// Same state, different description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

impl From<State> for NodeState {
    fn from(state: State) -> Self {
        Self::new(state, "")
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.description.is_empty() {
            write!(f, "{}", self.state)
        } else {
            write!(f, "{}: {}", self.state, self.description)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_codes() {
        for state in [
            State::Up,
            State::Down,
            State::Maintenance,
            State::Retired,
            State::Initializing,
            State::Stopping,
        ] {
            assert_eq!(State::from_code(&state.code().to_string()), Some(state));
        }
        assert_eq!(State::from_code("x"), None);
    }

    #[test]
    fn test_available_states() {
        assert!(State::Up.is_available());
        assert!(State::Retired.is_available());
        assert!(State::Initializing.is_available());
        assert!(!State::Maintenance.is_available());
        assert!(!State::Down.is_available());
        assert!(!State::Stopping.is_available());
    }

    #[test]
    fn test_node_state_equality_includes_description() {
        let a = NodeState::new(State::Maintenance, "kernel upgrade");
        assert_eq!(a, NodeState::new(State::Maintenance, "kernel upgrade"));
        assert_ne!(a, NodeState::new(State::Maintenance, "disk swap"));
        assert_ne!(a, NodeState::new(State::Down, "kernel upgrade"));
    }

    #[test]
    fn test_node_state_display() {
        assert_eq!(NodeState::up().to_string(), "UP");
        assert_eq!(
            NodeState::new(State::Maintenance, "reboot").to_string(),
            "MAINTENANCE: reboot"
        );
    }

    #[test]
    fn test_node_state_serde() {
        let state: NodeState = serde_json::from_str(r#"{"state": "RETIRED"}"#).unwrap();
        assert_eq!(state, NodeState::from(State::Retired));
    }
}
