// Path: crates/api/src/monitoring/mod.rs
//! Collaborator interfaces for the resource monitoring engine.
//!
//! The engine owns none of its inputs or outputs: usage acquisition, node
//! discovery, configuration, and both senders arrive through these seams.
//! All traits are object-safe and `Send + Sync` so implementations can be
//! shared with the sampling thread.

use crate::error::Result;
use aegis_types::alerts::AlertVariant;
use aegis_types::monitoring::{MonitoringData, NodeMonitoringSample};
use aegis_types::nodeinfo::{NodeConfig, NodeInfo, PartitionInfo};
use std::sync::Arc;

/// Supplies current resource usage for the node and for registered
/// workload instances.
pub trait ResourceUsageProvider: Send + Sync {
    /// Returns node-level usage. `partitions` lists the partitions the
    /// monitor expects `used_size` figures for.
    fn node_monitoring_data(
        &self,
        node_id: &str,
        partitions: &[PartitionInfo],
    ) -> Result<MonitoringData>;

    /// Returns usage for one instance. `not_found` is tolerated by the
    /// caller while an instance is starting up.
    fn instance_monitoring_data(&self, instance_id: &str) -> Result<MonitoringData>;
}

/// Transmits monitoring samples to the remote collector.
pub trait MonitorSender: Send + Sync {
    /// Sends one normalized node sample.
    fn send_monitoring_data(&self, sample: &NodeMonitoringSample) -> Result<()>;
}

/// Transmits quota alerts.
pub trait AlertSender: Send + Sync {
    /// Sends one alert record.
    fn send_alert(&self, alert: &AlertVariant) -> Result<()>;
}

/// Receives upstream connection state changes.
pub trait ConnectionSubscriber: Send + Sync {
    /// The upstream session is connected; publishing may resume.
    fn on_connect(&self);

    /// The upstream session dropped; publishing must stop.
    fn on_disconnect(&self);
}

/// Publishes upstream connection state to subscribers.
pub trait ConnectionPublisher: Send + Sync {
    /// Registers a subscriber for connect/disconnect events.
    fn subscribe(&self, subscriber: Arc<dyn ConnectionSubscriber>) -> Result<()>;

    /// Removes a previously registered subscriber.
    fn unsubscribe(&self, subscriber: &Arc<dyn ConnectionSubscriber>);
}

/// Supplies the static node description.
pub trait NodeInfoProvider: Send + Sync {
    /// Returns the node hardware snapshot.
    fn node_info(&self) -> Result<NodeInfo>;
}

/// Receives node configuration updates.
pub trait NodeConfigObserver: Send + Sync {
    /// A new node configuration is active.
    fn on_node_config_changed(&self, config: &NodeConfig);
}

/// Supplies the current node configuration and change notifications.
pub trait NodeConfigProvider: Send + Sync {
    /// Returns the current node configuration.
    fn node_config(&self) -> Result<NodeConfig>;

    /// Registers an observer for configuration changes.
    fn subscribe_node_config_changed(&self, observer: Arc<dyn NodeConfigObserver>) -> Result<()>;

    /// Removes a previously registered observer.
    fn unsubscribe_node_config_changed(&self, observer: &Arc<dyn NodeConfigObserver>);
}
