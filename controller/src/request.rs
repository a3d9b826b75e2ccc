//! Set-node-state requests as handed over by the REST layer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use fleetguard_common::{Node, NodeState};

/// Under which condition a wanted state should be set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Condition {
    /// Set the wanted state without any safety checks.
    Force,
    /// Set the wanted state only if it is safe to do so.
    Safe,
    /// A condition this controller does not know how to evaluate.
    Unsupported(String),
}

impl Condition {
    pub fn as_str(&self) -> &str {
        match self {
            Condition::Force => "FORCE",
            Condition::Safe => "SAFE",
            Condition::Unsupported(name) => name,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Condition {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "FORCE" => Condition::Force,
            "SAFE" => Condition::Safe,
            _ => Condition::Unsupported(s.to_string()),
        })
    }
}

impl From<String> for Condition {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(condition) => condition,
            Err(never) => match never {},
        }
    }
}

impl From<Condition> for String {
    fn from(condition: Condition) -> Self {
        condition.as_str().to_string()
    }
}

/// Request to change the wanted state of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetNodeStateRequest {
    /// Node whose wanted state should change.
    pub node: Node,
    /// Condition under which to apply the change.
    pub condition: Condition,
    /// Requested wanted state.
    pub new_wanted_state: NodeState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_parse() {
        assert_eq!("SAFE".parse::<Condition>().unwrap(), Condition::Safe);
        assert_eq!("FORCE".parse::<Condition>().unwrap(), Condition::Force);
        assert_eq!(
            "EVENTUALLY".parse::<Condition>().unwrap(),
            Condition::Unsupported("EVENTUALLY".to_string())
        );
    }

    #[test]
    fn test_condition_is_case_sensitive() {
        assert_eq!(
            "force".parse::<Condition>().unwrap(),
            Condition::Unsupported("force".to_string())
        );
        assert_eq!(
            Condition::from("Safe".to_string()),
            Condition::Unsupported("Safe".to_string())
        );
    }

    #[test]
    fn test_request_from_json() {
        let request: SetNodeStateRequest = serde_json::from_str(
            r#"{"node": {"type": "STORAGE", "index": 3},
                "condition": "SAFE",
                "new_wanted_state": {"state": "MAINTENANCE", "description": "os upgrade"}}"#,
        )
        .unwrap();

        assert_eq!(request.node, Node::storage(3));
        assert_eq!(request.condition, Condition::Safe);
        assert_eq!(request.new_wanted_state.description, "os upgrade");
    }
}
