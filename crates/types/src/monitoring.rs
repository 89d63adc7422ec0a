// Path: crates/types/src/monitoring.rs
//! Monitoring samples, alert rules, and resource identifiers.

use crate::instance::InstanceIdent;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime};

/// Resource usage of a single disk partition.
///
/// `total_size` and `path` are node metadata and pass through the
/// averaging filter unchanged; only `used_size` is sampled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionUsage {
    /// Partition name, unique per node.
    pub name: String,
    /// Mount path of the partition.
    pub path: String,
    /// Total capacity in bytes.
    pub total_size: u64,
    /// Currently used bytes.
    pub used_size: u64,
}

/// A single measurement of node or instance resource usage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitoringData {
    /// CPU load. The usage provider reports a percentage; the monitor
    /// rescales it to DMIPS before the sample leaves the engine.
    pub cpu: f64,
    /// RAM usage in bytes.
    pub ram: u64,
    /// Per-partition disk usage.
    pub partitions: Vec<PartitionUsage>,
    /// Downstream traffic in bytes.
    pub download: u64,
    /// Upstream traffic in bytes.
    pub upload: u64,
}

/// Resource usage of one workload instance within a node sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceMonitoringSample {
    /// Identity of the measured instance.
    pub instance_ident: InstanceIdent,
    /// The measured usage.
    pub data: MonitoringData,
}

/// A complete node sample: node-level usage plus one entry per monitored
/// instance, stamped with the acquisition time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeMonitoringSample {
    /// Identifier of the sampled node.
    pub node_id: String,
    /// Acquisition time of this sample.
    pub timestamp: SystemTime,
    /// Node-level usage.
    pub data: MonitoringData,
    /// Per-instance usage.
    pub instances: Vec<InstanceMonitoringSample>,
}

impl Default for NodeMonitoringSample {
    fn default() -> Self {
        Self {
            node_id: String::new(),
            timestamp: SystemTime::UNIX_EPOCH,
            data: MonitoringData::default(),
            instances: Vec::new(),
        }
    }
}

/// Threshold rule for one monitored resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRule {
    /// Dwell time required above `max_threshold` to raise an alert and
    /// below `min_threshold` to clear it.
    pub min_timeout: Duration,
    /// Lower hysteresis bound. Must not exceed `max_threshold`.
    pub min_threshold: u64,
    /// Upper hysteresis bound.
    pub max_threshold: u64,
}

/// Threshold rule for one named partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionAlertRule {
    /// Name of the partition the rule applies to.
    pub name: String,
    /// The thresholds.
    #[serde(flatten)]
    pub rule: AlertRule,
}

/// The full set of alert rules configured for a node or an instance.
///
/// CPU, RAM, and partition thresholds are configured as percentages of the
/// respective resource maximum; download/upload thresholds are absolute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRules {
    /// CPU rule, thresholds in percent of the node DMIPS budget.
    pub cpu: Option<AlertRule>,
    /// RAM rule, thresholds in percent of total RAM.
    pub ram: Option<AlertRule>,
    /// Per-partition rules, thresholds in percent of partition capacity.
    pub partitions: Vec<PartitionAlertRule>,
    /// Download rule, absolute bytes.
    pub download: Option<AlertRule>,
    /// Upload rule, absolute bytes.
    pub upload: Option<AlertRule>,
}

/// The level a monitored resource belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceLevel {
    /// Node-wide resource.
    Node,
    /// Per-instance resource.
    Instance,
}

/// The kind of a monitored resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceType {
    /// Processor load.
    Cpu,
    /// Memory usage.
    Ram,
    /// Downstream traffic.
    Download,
    /// Upstream traffic.
    Upload,
    /// Disk partition usage.
    Partition,
}

impl ResourceType {
    /// Returns the canonical parameter name used in alert records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Ram => "ram",
            Self::Download => "download",
            Self::Upload => "upload",
            Self::Partition => "partition",
        }
    }
}

/// Identifies one monitored resource: level, kind, and for partitions and
/// instance resources the owning partition name / instance id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    /// Node or instance level.
    pub level: ResourceLevel,
    /// Resource kind.
    pub resource: ResourceType,
    /// Partition name, for `ResourceType::Partition`.
    pub partition: Option<String>,
    /// Instance id, for instance-level resources.
    pub instance_id: Option<String>,
}

impl ResourceIdentifier {
    /// Creates a node-level identifier.
    pub fn node(resource: ResourceType) -> Self {
        Self {
            level: ResourceLevel::Node,
            resource,
            partition: None,
            instance_id: None,
        }
    }

    /// Creates a node-level partition identifier.
    pub fn node_partition(name: impl Into<String>) -> Self {
        Self {
            level: ResourceLevel::Node,
            resource: ResourceType::Partition,
            partition: Some(name.into()),
            instance_id: None,
        }
    }

    /// Creates an instance-level identifier.
    pub fn instance(resource: ResourceType, instance_id: impl Into<String>) -> Self {
        Self {
            level: ResourceLevel::Instance,
            resource,
            partition: None,
            instance_id: Some(instance_id.into()),
        }
    }

    /// Creates an instance-level partition identifier.
    pub fn instance_partition(name: impl Into<String>, instance_id: impl Into<String>) -> Self {
        Self {
            level: ResourceLevel::Instance,
            resource: ResourceType::Partition,
            partition: Some(name.into()),
            instance_id: Some(instance_id.into()),
        }
    }

    /// Returns the alert parameter name: the partition name when present,
    /// the resource kind otherwise.
    pub fn parameter_name(&self) -> &str {
        match &self.partition {
            Some(name) => name.as_str(),
            None => self.resource.as_str(),
        }
    }
}

impl fmt::Display for ResourceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            ResourceLevel::Node => "node",
            ResourceLevel::Instance => "instance",
        };

        write!(f, "{}/{}", level, self.resource.as_str())?;

        if let Some(partition) = &self.partition {
            write!(f, "/{partition}")?;
        }

        if let Some(instance) = &self.instance_id {
            write!(f, "@{instance}")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_name_prefers_partition() {
        let id = ResourceIdentifier::node_partition("state");
        assert_eq!(id.parameter_name(), "state");

        let id = ResourceIdentifier::node(ResourceType::Cpu);
        assert_eq!(id.parameter_name(), "cpu");
    }

    #[test]
    fn test_resource_identifier_display() {
        let id = ResourceIdentifier::instance_partition("storage", "instance0");
        assert_eq!(id.to_string(), "instance/partition/storage@instance0");
    }
}
