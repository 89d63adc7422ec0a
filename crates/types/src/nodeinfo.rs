// Path: crates/types/src/nodeinfo.rs
//! Node hardware description and node-level configuration.

use crate::monitoring::AlertRules;
use serde::{Deserialize, Serialize};

/// Static description of one disk partition on the node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionInfo {
    /// Partition name, unique per node.
    pub name: String,
    /// Mount path of the partition.
    pub path: String,
    /// Total capacity in bytes.
    pub total_size: u64,
}

/// Hardware snapshot of the node taken at monitor initialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    /// Node identifier.
    pub node_id: String,
    /// Processor budget in DMIPS; CPU percentages scale against this.
    pub max_dmips: u64,
    /// Total RAM in bytes.
    pub total_ram: u64,
    /// Disk partitions available on the node.
    pub partitions: Vec<PartitionInfo>,
}

/// Node-level configuration delivered by the configuration service.
///
/// Only the parts the monitoring engine consumes are modeled here; the
/// engine rebuilds its node alert processors whenever a new version
/// arrives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Configuration version, logged on change.
    pub version: String,
    /// Alert rules for node resources, absent when alerting is disabled.
    pub alert_rules: Option<AlertRules>,
}

/// Per-instance monitoring parameters supplied at instance start.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceMonitorParams {
    /// Identity of the instance being monitored.
    pub instance_ident: crate::instance::InstanceIdent,
    /// Partitions the instance writes to.
    pub partitions: Vec<PartitionInfo>,
    /// Alert rules for the instance, absent when alerting is disabled.
    pub alert_rules: Option<AlertRules>,
}
