//! Telemetry documents reported by nodes.
//!
//! Every observation is optional: a value that has not been reported yet is
//! `None`, which is not the same as a reported zero.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::Result;

/// Name of the metric counting the buckets a storage node manages.
pub const BUCKETS_METRIC_NAME: &str = "vds.datastored.bucket_space.buckets_total";

/// Dimension key and value selecting the default bucket space of [`BUCKETS_METRIC_NAME`].
pub const BUCKETS_METRIC_DIMENSIONS: [(&str, &str); 1] = [("bucketSpace", "default")];

/// Latest telemetry snapshot reported by a node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HostInfo {
    /// Version of the last cluster state the node acknowledged.
    #[serde(default)]
    pub cluster_state_version: Option<u32>,
    /// Reported metric values.
    #[serde(default)]
    pub metrics: Metrics,
    /// Replication observations, only reported by distributors.
    #[serde(default)]
    pub distributor: DistributorHostInfo,
    /// When the controller received this snapshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_at: Option<DateTime<Utc>>,
}

impl HostInfo {
    /// Parse a host info document.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Cluster state version, `None` until the node has reported one.
    pub fn cluster_state_version(&self) -> Option<u32> {
        self.cluster_state_version
    }

    /// Last bucket count of the default bucket space, if reported.
    pub fn bucket_count(&self) -> Option<i64> {
        let dimensions: BTreeMap<String, String> = BUCKETS_METRIC_DIMENSIONS
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.metrics
            .value_at(BUCKETS_METRIC_NAME, &dimensions)
            .and_then(|metric| metric.values.last)
    }

    /// Minimum replication factor a distributor observed for a storage node.
    ///
    /// Only the first entry for the node is considered.
    pub fn min_replication_factor_for(&self, storage_index: u16) -> Option<u32> {
        self.distributor
            .storage_nodes
            .iter()
            .find(|n| n.node_index == storage_index)
            .and_then(|n| n.min_current_replication_factor)
    }
}

/// Metric section of a host info document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// All reported metric values.
    #[serde(default)]
    pub values: Vec<MetricValue>,
}

impl Metrics {
    /// Find the metric with the given name and exactly the given dimensions.
    pub fn value_at(
        &self,
        name: &str,
        dimensions: &BTreeMap<String, String>,
    ) -> Option<&MetricValue> {
        self.values
            .iter()
            .find(|metric| metric.name == name && &metric.dimensions == dimensions)
    }
}

/// A single named metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricValue {
    /// Metric name.
    pub name: String,
    /// Aggregated values of the metric.
    #[serde(default)]
    pub values: MetricValues,
    /// Dimensions identifying the metric instance.
    #[serde(default)]
    pub dimensions: BTreeMap<String, String>,
}

/// Aggregates of a metric over the last snapshot period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricValues {
    /// Last observed value.
    #[serde(default)]
    pub last: Option<i64>,
    #[serde(default)]
    pub average: Option<f64>,
    #[serde(default)]
    pub count: Option<u64>,
}

/// Distributor specific section of a host info document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistributorHostInfo {
    /// What the distributor knows about each storage node.
    #[serde(default, rename = "storage-nodes")]
    pub storage_nodes: Vec<StorageNodeReport>,
}

/// A distributor's view of a single storage node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StorageNodeReport {
    /// Index of the storage node.
    pub node_index: u16,
    /// Lowest replication factor among buckets on the node, `None` when the
    /// distributor has no opinion (e.g. the node holds no buckets).
    #[serde(default)]
    pub min_current_replication_factor: Option<u32>,
}
