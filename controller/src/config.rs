//! Controller configuration.

use serde::Deserialize;

/// Policy parameters of the node state change checker.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    /// Minimum number of storage nodes the cluster must have before any may be taken out.
    pub min_storage_nodes_up: usize,
    /// Minimum fraction of storage nodes that must be available.
    pub min_ratio_of_storage_nodes_up: f64,
    /// Lowest replication factor distributors may report for a node going into maintenance.
    pub required_redundancy: u32,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            min_storage_nodes_up: 1,
            min_ratio_of_storage_nodes_up: 0.0,
            required_redundancy: 2,
        }
    }
}

impl CheckerConfig {
    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.min_ratio_of_storage_nodes_up) {
            return Err(format!(
                "Minimum ratio of storage nodes up must be within [0, 1], got {}",
                self.min_ratio_of_storage_nodes_up
            ));
        }

        Ok(())
    }
}

/// Main controller configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Name of the content cluster, used in logs.
    pub cluster_name: String,
    /// Checker policy.
    pub checker: CheckerConfig,
    /// Log level.
    pub log_level: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            cluster_name: "content".to_string(),
            checker: CheckerConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Override fields with values from environment variables, when set and parseable.
    pub fn apply_env(&mut self) {
        if let Ok(name) = std::env::var("FLEETGUARD_CLUSTER_NAME") {
            self.cluster_name = name;
        }

        if let Ok(min) = std::env::var("FLEETGUARD_MIN_STORAGE_NODES_UP") {
            if let Ok(min) = min.parse() {
                self.checker.min_storage_nodes_up = min;
            }
        }

        if let Ok(ratio) = std::env::var("FLEETGUARD_MIN_RATIO_OF_STORAGE_NODES_UP") {
            if let Ok(ratio) = ratio.parse() {
                self.checker.min_ratio_of_storage_nodes_up = ratio;
            }
        }

        if let Ok(redundancy) = std::env::var("FLEETGUARD_REQUIRED_REDUNDANCY") {
            if let Ok(redundancy) = redundancy.parse() {
                self.checker.required_redundancy = redundancy;
            }
        }

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.log_level = level;
        }
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.cluster_name.is_empty() {
            return Err("Cluster name cannot be empty".to_string());
        }

        self.checker.validate()
    }
}
