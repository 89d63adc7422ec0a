// Path: crates/monitoring/tests/monitor_test.rs
//! End-to-end tests of the resource monitor engine with mock
//! collaborators.

use aegis_api::error::{ErrorCode, Result};
use aegis_api::monitoring::{
    AlertSender, ConnectionPublisher, ConnectionSubscriber, MonitorSender, NodeConfigObserver,
    NodeConfigProvider, NodeInfoProvider, ResourceUsageProvider,
};
use aegis_monitoring::{Config, ResourceMonitor};
use aegis_types::alerts::{AlertVariant, QuotaAlertState};
use aegis_types::error::Error;
use aegis_types::instance::{InstanceIdent, InstanceState};
use aegis_types::monitoring::{
    AlertRule, AlertRules, MonitoringData, NodeMonitoringSample, PartitionUsage,
};
use aegis_types::nodeinfo::{InstanceMonitorParams, NodeConfig, NodeInfo, PartitionInfo};
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;

const WAIT_TIMEOUT: Duration = Duration::from_secs(5);
const POLL_PERIOD: Duration = Duration::from_millis(50);
// Ticks that arrive before the test provides data give up quickly; the
// engine logs the timeout and retries on the next tick.
const PROVIDER_TIMEOUT: Duration = Duration::from_millis(500);

struct MockNodeInfoProvider {
    node_info: NodeInfo,
}

impl NodeInfoProvider for MockNodeInfoProvider {
    fn node_info(&self) -> Result<NodeInfo> {
        Ok(self.node_info.clone())
    }
}

/// Usage provider that blocks the node query until the test supplies
/// data, pairing each provided sample with exactly one tick.
#[derive(Default)]
struct MockUsageProvider {
    node_data: Mutex<Option<MonitoringData>>,
    instances: Mutex<HashMap<String, MonitoringData>>,
    provided: Condvar,
}

impl MockUsageProvider {
    fn provide(&self, node_data: MonitoringData, instances: &[(&str, MonitoringData)]) {
        let mut guard = self.node_data.lock();

        *self.instances.lock() = instances
            .iter()
            .map(|(id, data)| (id.to_string(), data.clone()))
            .collect();
        *guard = Some(node_data);

        self.provided.notify_one();
    }
}

impl ResourceUsageProvider for MockUsageProvider {
    fn node_monitoring_data(
        &self,
        _node_id: &str,
        _partitions: &[PartitionInfo],
    ) -> Result<MonitoringData> {
        let mut guard = self.node_data.lock();

        if guard.is_none() {
            let _ = self.provided.wait_for(&mut guard, PROVIDER_TIMEOUT);
        }

        guard.take().ok_or(Error::Timeout("no monitoring data".into()))
    }

    fn instance_monitoring_data(&self, instance_id: &str) -> Result<MonitoringData> {
        self.instances
            .lock()
            .get(instance_id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("instance {instance_id}")))
    }
}

struct MockSender {
    sent: Sender<NodeMonitoringSample>,
}

impl MonitorSender for MockSender {
    fn send_monitoring_data(&self, sample: &NodeMonitoringSample) -> Result<()> {
        let _ = self.sent.send(sample.clone());

        Ok(())
    }
}

struct MockAlertSender {
    sent: Sender<AlertVariant>,
}

impl AlertSender for MockAlertSender {
    fn send_alert(&self, alert: &AlertVariant) -> Result<()> {
        let _ = self.sent.send(alert.clone());

        Ok(())
    }
}

#[derive(Default)]
struct MockConnectionPublisher {
    subscriber: Mutex<Option<Arc<dyn ConnectionSubscriber>>>,
}

impl MockConnectionPublisher {
    fn notify_connect(&self) {
        let subscriber = self.subscriber.lock().clone();
        subscriber.expect("no subscriber").on_connect();
    }

    fn notify_disconnect(&self) {
        let subscriber = self.subscriber.lock().clone();
        subscriber.expect("no subscriber").on_disconnect();
    }
}

impl ConnectionPublisher for MockConnectionPublisher {
    fn subscribe(&self, subscriber: Arc<dyn ConnectionSubscriber>) -> Result<()> {
        *self.subscriber.lock() = Some(subscriber);

        Ok(())
    }

    fn unsubscribe(&self, subscriber: &Arc<dyn ConnectionSubscriber>) {
        let mut guard = self.subscriber.lock();
        if let Some(known) = guard.as_ref() {
            assert!(Arc::ptr_eq(known, subscriber));
        }
        *guard = None;
    }
}

#[derive(Default)]
struct MockNodeConfigProvider {
    config: Mutex<NodeConfig>,
    observer: Mutex<Option<Arc<dyn NodeConfigObserver>>>,
}

impl MockNodeConfigProvider {
    fn notify_config(&self, config: NodeConfig) {
        *self.config.lock() = config.clone();

        let observer = self.observer.lock().clone();
        if let Some(observer) = observer {
            observer.on_node_config_changed(&config);
        }
    }
}

impl NodeConfigProvider for MockNodeConfigProvider {
    fn node_config(&self) -> Result<NodeConfig> {
        Ok(self.config.lock().clone())
    }

    fn subscribe_node_config_changed(&self, observer: Arc<dyn NodeConfigObserver>) -> Result<()> {
        *self.observer.lock() = Some(observer);

        Ok(())
    }

    fn unsubscribe_node_config_changed(&self, _observer: &Arc<dyn NodeConfigObserver>) {
        *self.observer.lock() = None;
    }
}

struct Fixture {
    monitor: ResourceMonitor,
    usage: Arc<MockUsageProvider>,
    samples: Receiver<NodeMonitoringSample>,
    alerts: Receiver<AlertVariant>,
    connection: Arc<MockConnectionPublisher>,
    node_config: Arc<MockNodeConfigProvider>,
}

fn node_info() -> NodeInfo {
    NodeInfo {
        node_id: "node1".into(),
        max_dmips: 10_000,
        total_ram: 8192,
        partitions: vec![
            PartitionInfo {
                name: "disk1".into(),
                path: "/var/disk1".into(),
                total_size: 512,
            },
            PartitionInfo {
                name: "disk2".into(),
                path: "/var/disk2".into(),
                total_size: 1024,
            },
        ],
    }
}

fn fixture(config: Config) -> Fixture {
    aegis_telemetry::init_test_logging();

    let usage = Arc::new(MockUsageProvider::default());
    let (sample_tx, samples) = channel();
    let (alert_tx, alerts) = channel();
    let connection = Arc::new(MockConnectionPublisher::default());
    let node_config = Arc::new(MockNodeConfigProvider::default());

    let monitor = ResourceMonitor::new(
        config,
        Arc::new(MockNodeInfoProvider {
            node_info: node_info(),
        }),
        usage.clone(),
        Arc::new(MockSender { sent: sample_tx }),
        Arc::new(MockAlertSender { sent: alert_tx }),
        connection.clone(),
        node_config.clone(),
    )
    .unwrap();

    Fixture {
        monitor,
        usage,
        samples,
        alerts,
        connection,
        node_config,
    }
}

fn monitoring_data(cpu: f64, ram: u64, download: u64, upload: u64) -> MonitoringData {
    MonitoringData {
        cpu,
        ram,
        download,
        upload,
        partitions: Vec::new(),
    }
}

#[test]
fn test_node_monitoring_data_is_published() {
    let mut fixture = fixture(Config {
        poll_period: POLL_PERIOD,
        average_window: POLL_PERIOD * 4,
    });

    fixture.monitor.start().unwrap();
    fixture.connection.notify_connect();

    let instance0 = InstanceIdent::new("service0", "subject0", 0);
    let instance1 = InstanceIdent::new("service1", "subject1", 1);

    fixture
        .monitor
        .start_instance_monitoring(
            "instance0",
            InstanceMonitorParams {
                instance_ident: instance0.clone(),
                ..InstanceMonitorParams::default()
            },
        )
        .unwrap();
    fixture
        .monitor
        .start_instance_monitoring(
            "instance1",
            InstanceMonitorParams {
                instance_ident: instance1.clone(),
                ..InstanceMonitorParams::default()
            },
        )
        .unwrap();

    fixture.usage.provide(
        monitoring_data(30.0, 8192, 120, 240),
        &[
            ("instance0", monitoring_data(10.0, 2048, 10, 20)),
            ("instance1", monitoring_data(15.0, 1024, 20, 40)),
        ],
    );

    let sample = fixture.samples.recv_timeout(WAIT_TIMEOUT).unwrap();

    assert_eq!(sample.node_id, "node1");
    // CPU percentages are rescaled to DMIPS: 30% of 10000.
    assert_eq!(sample.data.cpu, 3000.0);
    assert_eq!(sample.data.ram, 8192);
    assert_eq!(sample.data.download, 120);
    assert_eq!(sample.data.upload, 240);

    assert_eq!(sample.instances.len(), 2);
    let by_ident: HashMap<_, _> = sample
        .instances
        .iter()
        .map(|entry| (entry.instance_ident.clone(), entry.data.clone()))
        .collect();
    assert_eq!(by_ident[&instance0].cpu, 1000.0);
    assert_eq!(by_ident[&instance0].ram, 2048);
    assert_eq!(by_ident[&instance1].cpu, 1500.0);
    assert_eq!(by_ident[&instance1].upload, 40);

    fixture.monitor.stop().unwrap();
}

#[test]
fn test_normalization_keeps_node_above_instance_sum() {
    let mut fixture = fixture(Config {
        poll_period: POLL_PERIOD,
        average_window: POLL_PERIOD,
    });

    fixture.monitor.start().unwrap();
    fixture.connection.notify_connect();

    let ident = InstanceIdent::new("service0", "subject0", 0);
    fixture
        .monitor
        .start_instance_monitoring(
            "instance0",
            InstanceMonitorParams {
                instance_ident: ident,
                ..InstanceMonitorParams::default()
            },
        )
        .unwrap();

    // Node figures below the instance totals, and a node partition whose
    // instance counterpart is larger.
    let mut node_data = monitoring_data(10.0, 1000, 5, 5);
    node_data.partitions.push(PartitionUsage {
        name: "disk1".into(),
        path: "/var/disk1".into(),
        total_size: 512,
        used_size: 100,
    });

    let mut instance_data = monitoring_data(20.0, 3000, 50, 70);
    instance_data.partitions.push(PartitionUsage {
        name: "disk1".into(),
        path: "/var/disk1".into(),
        total_size: 512,
        used_size: 300,
    });

    fixture
        .usage
        .provide(node_data, &[("instance0", instance_data)]);

    let sample = fixture.samples.recv_timeout(WAIT_TIMEOUT).unwrap();

    // Node values are the component-wise maximum of the prior node value
    // and the instance sums.
    assert_eq!(sample.data.cpu, 2000.0);
    assert_eq!(sample.data.ram, 3000);
    assert_eq!(sample.data.download, 50);
    assert_eq!(sample.data.upload, 70);
    assert_eq!(sample.data.partitions[0].used_size, 300);

    fixture.monitor.stop().unwrap();
}

#[test]
fn test_average_monitoring_data_window_four() {
    let mut fixture = fixture(Config {
        poll_period: POLL_PERIOD,
        average_window: POLL_PERIOD * 4,
    });

    fixture.monitor.start().unwrap();
    fixture.connection.notify_connect();

    // CPU% per tick: 100, 100, 100, 100, 0.
    for cpu in [100.0, 100.0, 100.0, 100.0, 0.0] {
        fixture.usage.provide(monitoring_data(cpu, 0, 0, 0), &[]);
        fixture.samples.recv_timeout(WAIT_TIMEOUT).unwrap();
    }

    let average = fixture.monitor.get_average_monitoring_data().unwrap();

    // (3·100 + 0)/4 percent, rescaled by max_dmips/100.
    assert_eq!(average.data.cpu, 7500.0);
    assert_eq!(average.node_id, "node1");

    fixture.monitor.stop().unwrap();
}

#[test]
fn test_publishing_is_gated_by_connection() {
    let mut fixture = fixture(Config {
        poll_period: POLL_PERIOD,
        average_window: POLL_PERIOD,
    });

    fixture.monitor.start().unwrap();

    // Disconnected: the tick consumes the data but nothing is published.
    fixture.usage.provide(monitoring_data(10.0, 100, 0, 0), &[]);
    assert!(fixture
        .samples
        .recv_timeout(Duration::from_millis(500))
        .is_err());

    // Connected: the very next tick publishes.
    fixture.connection.notify_connect();
    fixture.usage.provide(monitoring_data(20.0, 200, 0, 0), &[]);
    let sample = fixture.samples.recv_timeout(WAIT_TIMEOUT).unwrap();
    assert_eq!(sample.data.ram, 200);

    // Disconnect suppresses publishing again while sampling continues.
    fixture.connection.notify_disconnect();
    fixture.usage.provide(monitoring_data(30.0, 300, 0, 0), &[]);
    assert!(fixture
        .samples
        .recv_timeout(Duration::from_millis(500))
        .is_err());

    fixture.monitor.stop().unwrap();
}

#[test]
fn test_node_alert_rules_raise_alerts() {
    let mut fixture = fixture(Config {
        poll_period: POLL_PERIOD,
        average_window: POLL_PERIOD,
    });

    // CPU rule in percent of the DMIPS budget, zero dwell time.
    fixture.node_config.notify_config(NodeConfig {
        version: "1.0".into(),
        alert_rules: Some(AlertRules {
            cpu: Some(AlertRule {
                min_timeout: Duration::ZERO,
                min_threshold: 50,
                max_threshold: 85,
            }),
            ..AlertRules::default()
        }),
    });

    fixture.monitor.start().unwrap();
    fixture.connection.notify_connect();

    fixture.usage.provide(monitoring_data(90.0, 0, 0, 0), &[]);
    fixture.samples.recv_timeout(WAIT_TIMEOUT).unwrap();

    let alert = fixture.alerts.recv_timeout(WAIT_TIMEOUT).unwrap();
    match alert {
        AlertVariant::NodeQuota(alert) => {
            assert_eq!(alert.node_id, "node1");
            assert_eq!(alert.parameter, "cpu");
            assert_eq!(alert.state, QuotaAlertState::Raise);
            // 90% of 10000 DMIPS.
            assert_eq!(alert.value, 9000);
        }
        other => panic!("unexpected alert: {other:?}"),
    }

    fixture.monitor.stop().unwrap();
}

#[test]
fn test_node_config_change_rebuilds_alert_processors() {
    let mut fixture = fixture(Config {
        poll_period: POLL_PERIOD,
        average_window: POLL_PERIOD,
    });

    fixture.monitor.start().unwrap();
    fixture.connection.notify_connect();

    // No rules configured: high CPU produces no alert.
    fixture.usage.provide(monitoring_data(95.0, 0, 0, 0), &[]);
    fixture.samples.recv_timeout(WAIT_TIMEOUT).unwrap();
    assert!(fixture
        .alerts
        .recv_timeout(Duration::from_millis(200))
        .is_err());

    // A config update installs a CPU rule.
    fixture.node_config.notify_config(NodeConfig {
        version: "2.0".into(),
        alert_rules: Some(AlertRules {
            cpu: Some(AlertRule {
                min_timeout: Duration::ZERO,
                min_threshold: 50,
                max_threshold: 85,
            }),
            ..AlertRules::default()
        }),
    });

    fixture.usage.provide(monitoring_data(95.0, 0, 0, 0), &[]);
    fixture.samples.recv_timeout(WAIT_TIMEOUT).unwrap();

    let alert = fixture.alerts.recv_timeout(WAIT_TIMEOUT).unwrap();
    assert_eq!(alert.state(), QuotaAlertState::Raise);

    fixture.monitor.stop().unwrap();
}

#[test]
fn test_instance_alert_rules() {
    let mut fixture = fixture(Config {
        poll_period: POLL_PERIOD,
        average_window: POLL_PERIOD,
    });

    fixture.monitor.start().unwrap();
    fixture.connection.notify_connect();

    let ident = InstanceIdent::new("service0", "subject0", 0);
    fixture
        .monitor
        .start_instance_monitoring(
            "instance0",
            InstanceMonitorParams {
                instance_ident: ident.clone(),
                alert_rules: Some(AlertRules {
                    ram: Some(AlertRule {
                        min_timeout: Duration::ZERO,
                        min_threshold: 10,
                        max_threshold: 50,
                    }),
                    ..AlertRules::default()
                }),
                ..InstanceMonitorParams::default()
            },
        )
        .unwrap();

    // 8192 total RAM: the 50% threshold is 4096; 5000 crosses it.
    fixture.usage.provide(
        monitoring_data(0.0, 0, 0, 0),
        &[("instance0", monitoring_data(0.0, 5000, 0, 0))],
    );
    fixture.samples.recv_timeout(WAIT_TIMEOUT).unwrap();

    let alert = fixture.alerts.recv_timeout(WAIT_TIMEOUT).unwrap();
    match alert {
        AlertVariant::InstanceQuota(alert) => {
            assert_eq!(alert.instance_ident, ident);
            assert_eq!(alert.parameter, "ram");
            assert_eq!(alert.state, QuotaAlertState::Raise);
            assert_eq!(alert.value, 5000);
        }
        other => panic!("unexpected alert: {other:?}"),
    }

    fixture.monitor.stop().unwrap();
}

#[test]
fn test_instance_lifecycle_errors() {
    let mut fixture = fixture(Config {
        poll_period: Duration::from_secs(3600),
        average_window: Duration::from_secs(3600),
    });

    fixture.monitor.start().unwrap();

    let params = InstanceMonitorParams {
        instance_ident: InstanceIdent::new("service0", "subject0", 0),
        ..InstanceMonitorParams::default()
    };

    fixture
        .monitor
        .start_instance_monitoring("instance0", params.clone())
        .unwrap();

    let err = fixture
        .monitor
        .start_instance_monitoring("instance0", params)
        .unwrap_err();
    assert_eq!(err.code(), "ALREADY_EXISTS");

    // Updating an unknown instance is not-found; stopping one is not an
    // error.
    let err = fixture
        .monitor
        .update_instance_state("ghost", InstanceState::Stopped)
        .unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");

    fixture.monitor.stop_instance_monitoring("ghost").unwrap();

    fixture
        .monitor
        .update_instance_state("instance0", InstanceState::Stopped)
        .unwrap();
    fixture.monitor.stop_instance_monitoring("instance0").unwrap();

    fixture.monitor.stop().unwrap();
}

#[test]
fn test_double_start_is_wrong_state() {
    let mut fixture = fixture(Config {
        poll_period: Duration::from_secs(3600),
        average_window: Duration::from_secs(3600),
    });

    fixture.monitor.start().unwrap();

    let err = fixture.monitor.start().unwrap_err();
    assert_eq!(err.code(), "WRONG_STATE");

    // Stop joins the sampler; a stopped monitor can start again.
    fixture.monitor.stop().unwrap();
    fixture.monitor.start().unwrap();
    fixture.monitor.stop().unwrap();
}
