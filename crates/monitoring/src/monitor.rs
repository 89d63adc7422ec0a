// Path: crates/monitoring/src/monitor.rs
//! The resource monitor engine.
//!
//! One dedicated thread samples node and instance usage at the poll
//! period, folds samples into the moving average, evaluates the alert
//! processors, and forwards the normalized sample to the monitor sender
//! while the upstream connection is up. The engine mutex protects the
//! instance table, the node alert processors, and the send flag; the
//! blocking provider and sender calls run outside it.

use crate::alert::AlertProcessor;
use crate::average::Average;
use crate::config::Config;
use crate::error::{Error, Result};
use aegis_api::monitoring::{
    AlertSender, ConnectionPublisher, ConnectionSubscriber, MonitorSender, NodeConfigObserver,
    NodeConfigProvider, NodeInfoProvider, ResourceUsageProvider,
};
use aegis_types::alerts::{AlertVariant, InstanceQuotaAlert, NodeQuotaAlert, QuotaAlertState};
use aegis_types::instance::{InstanceIdent, InstanceState};
use aegis_types::monitoring::{
    AlertRule, AlertRules, InstanceMonitoringSample, MonitoringData, NodeMonitoringSample,
    ResourceIdentifier, ResourceType,
};
use aegis_types::nodeinfo::{InstanceMonitorParams, NodeConfig, NodeInfo};
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::SystemTime;

struct InstanceEntry {
    params: InstanceMonitorParams,
    state: InstanceState,
    alert_processors: Vec<AlertProcessor>,
}

struct EngineState {
    running: bool,
    stopping: bool,
    send_monitoring: bool,
    average: Average,
    node_alert_processors: Vec<AlertProcessor>,
    instances: HashMap<String, InstanceEntry>,
}

struct Engine {
    node_info: NodeInfo,
    usage_provider: Arc<dyn ResourceUsageProvider>,
    monitor_sender: Arc<dyn MonitorSender>,
    alert_sender: Arc<dyn AlertSender>,
    state: Mutex<EngineState>,
    tick: Condvar,
}

/// Periodic node and instance resource monitor.
pub struct ResourceMonitor {
    config: Config,
    engine: Arc<Engine>,
    subscriptions: Arc<Subscriptions>,
    connection_publisher: Arc<dyn ConnectionPublisher>,
    node_config_provider: Arc<dyn NodeConfigProvider>,
    sampler: Option<JoinHandle<()>>,
}

/// Adapter receiving connection and node-config events for the engine.
struct Subscriptions {
    engine: Arc<Engine>,
}

impl ConnectionSubscriber for Subscriptions {
    fn on_connect(&self) {
        let mut state = self.engine.state.lock();

        log::debug!("connection event");

        state.send_monitoring = true;
    }

    fn on_disconnect(&self) {
        let mut state = self.engine.state.lock();

        log::debug!("disconnection event");

        state.send_monitoring = false;
    }
}

impl NodeConfigObserver for Subscriptions {
    fn on_node_config_changed(&self, config: &NodeConfig) {
        let mut state = self.engine.state.lock();

        log::debug!("receive node config: version={}", config.version);

        self.engine.setup_node_alerts(&mut state, config);
    }
}

impl ResourceMonitor {
    /// Initializes the monitor: snapshots the node info and prepares the
    /// averaging filter. Call [`ResourceMonitor::start`] to begin
    /// sampling.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        node_info_provider: Arc<dyn NodeInfoProvider>,
        usage_provider: Arc<dyn ResourceUsageProvider>,
        monitor_sender: Arc<dyn MonitorSender>,
        alert_sender: Arc<dyn AlertSender>,
        connection_publisher: Arc<dyn ConnectionPublisher>,
        node_config_provider: Arc<dyn NodeConfigProvider>,
    ) -> Result<Self> {
        log::debug!("init resource monitor");

        let node_info = node_info_provider.node_info()?;

        if config.poll_period.is_zero() {
            return Err(Error::invalid_argument("poll period must be non-zero"));
        }

        let engine = Arc::new(Engine {
            node_info,
            usage_provider,
            monitor_sender,
            alert_sender,
            state: Mutex::new(EngineState {
                running: false,
                stopping: false,
                send_monitoring: false,
                average: Average::new(config.window_count()),
                node_alert_processors: Vec::new(),
                instances: HashMap::new(),
            }),
            tick: Condvar::new(),
        });

        let subscriptions = Arc::new(Subscriptions {
            engine: engine.clone(),
        });

        Ok(Self {
            config,
            engine,
            subscriptions,
            connection_publisher,
            node_config_provider,
            sampler: None,
        })
    }

    /// Starts the sampling thread and subscribes to connection and
    /// node-config events. A second start is a `wrong_state` error.
    pub fn start(&mut self) -> Result<()> {
        log::debug!("start monitoring");

        {
            let mut state = self.engine.state.lock();
            if state.running {
                return Err(Error::wrong_state("monitoring already started"));
            }
            state.running = true;
            state.stopping = false;
            state.send_monitoring = false;
        }

        self.connection_publisher
            .subscribe(self.subscriptions.clone())?;

        match self.node_config_provider.node_config() {
            Ok(node_config) => {
                let mut state = self.engine.state.lock();
                self.engine.setup_node_alerts(&mut state, &node_config);
            }
            Err(err) => log::error!("get node config failed: {err}"),
        }

        self.node_config_provider
            .subscribe_node_config_changed(self.subscriptions.clone())?;

        let engine = self.engine.clone();
        let poll_period = self.config.poll_period;

        self.sampler = Some(std::thread::spawn(move || loop {
            {
                let mut state = engine.state.lock();
                if state.stopping {
                    break;
                }

                let _ = engine.tick.wait_for(&mut state, poll_period);

                if state.stopping {
                    break;
                }
            }

            engine.process_monitoring();
        }));

        Ok(())
    }

    /// Stops sampling: wakes and joins the sampler thread, then drops the
    /// event subscriptions.
    pub fn stop(&mut self) -> Result<()> {
        log::debug!("stop monitoring");

        {
            let mut state = self.engine.state.lock();
            if !state.running {
                log::warn!("monitoring is not started");

                return Ok(());
            }
            state.stopping = true;
            state.running = false;
        }

        self.engine.tick.notify_all();

        if let Some(sampler) = self.sampler.take() {
            if sampler.join().is_err() {
                log::error!("sampler thread panicked");
            }
        }

        let connection: Arc<dyn ConnectionSubscriber> = self.subscriptions.clone();
        self.connection_publisher.unsubscribe(&connection);

        let observer: Arc<dyn NodeConfigObserver> = self.subscriptions.clone();
        self.node_config_provider
            .unsubscribe_node_config_changed(&observer);

        Ok(())
    }

    /// Registers an instance for monitoring and builds its alert
    /// processors. A duplicate id is `already_exists`.
    pub fn start_instance_monitoring(
        &self,
        instance_id: &str,
        params: InstanceMonitorParams,
    ) -> Result<()> {
        let mut state = self.engine.state.lock();

        log::debug!("start instance monitoring: instanceID={instance_id}");

        if state.instances.contains_key(instance_id) {
            return Err(Error::already_exists("instance monitoring already started"));
        }

        // A missing first reading is expected while the instance spins up.
        if let Err(err) = self.engine.usage_provider.instance_monitoring_data(instance_id) {
            log::warn!("can't get instance monitoring data: instanceID={instance_id}, err={err}");
        }

        let alert_processors = match &params.alert_rules {
            Some(rules) => {
                self.engine
                    .build_instance_alerts(instance_id, &params.instance_ident, rules, &params)
            }
            None => Vec::new(),
        };

        state.average.start_instance(&params.instance_ident)?;

        state.instances.insert(
            instance_id.to_string(),
            InstanceEntry {
                params,
                state: InstanceState::Active,
                alert_processors,
            },
        );

        Ok(())
    }

    /// Removes an instance from monitoring. An unknown id is tolerated.
    pub fn stop_instance_monitoring(&self, instance_id: &str) -> Result<()> {
        let mut state = self.engine.state.lock();

        log::debug!("stop instance monitoring: instanceID={instance_id}");

        let Some(entry) = state.instances.remove(instance_id) else {
            log::warn!("instance monitoring not found: instanceID={instance_id}");

            return Ok(());
        };

        if let Err(err) = state.average.stop_instance(&entry.params.instance_ident) {
            log::error!("can't stop instance averaging: instanceID={instance_id}, err={err}");

            return Err(err);
        }

        Ok(())
    }

    /// Updates the lifecycle state of a monitored instance. Usage
    /// acquisition failures are only logged at error level for active
    /// instances.
    pub fn update_instance_state(&self, instance_id: &str, new_state: InstanceState) -> Result<()> {
        let mut state = self.engine.state.lock();

        log::debug!("update instance state: instanceID={instance_id}, state={new_state}");

        let Some(entry) = state.instances.get_mut(instance_id) else {
            return Err(Error::not_found(format!("instance {instance_id}")));
        };

        entry.state = new_state;

        Ok(())
    }

    /// Returns the moving-average snapshot stamped with the current time
    /// and the node id.
    pub fn get_average_monitoring_data(&self) -> Result<NodeMonitoringSample> {
        let state = self.engine.state.lock();

        let mut sample = state.average.data();
        sample.timestamp = SystemTime::now();
        sample.node_id = self.engine.node_info.node_id.clone();

        Ok(sample)
    }
}

impl Drop for ResourceMonitor {
    fn drop(&mut self) {
        let running = self.engine.state.lock().running;
        if running {
            let _ = self.stop();
        }
    }
}

impl Engine {
    /// One sampling tick.
    fn process_monitoring(&self) {
        let timestamp = SystemTime::now();

        // Snapshot the instance table so the provider calls run without
        // the engine lock.
        let instance_ids: Vec<(String, InstanceState)> = {
            let state = self.state.lock();
            state
                .instances
                .iter()
                .map(|(id, entry)| (id.clone(), entry.state))
                .collect()
        };

        let mut instance_samples: Vec<(String, MonitoringData)> = Vec::new();

        for (instance_id, instance_state) in instance_ids {
            match self.usage_provider.instance_monitoring_data(&instance_id) {
                Ok(mut data) => {
                    data.cpu = self.cpu_to_dmips(data.cpu);
                    instance_samples.push((instance_id, data));
                }
                Err(err) => {
                    if instance_state == InstanceState::Active {
                        log::error!(
                            "failed to get instance monitoring data: instanceID={instance_id}, err={err}"
                        );
                    } else {
                        log::debug!(
                            "instance data not available: instanceID={instance_id}, err={err}"
                        );
                    }
                }
            }
        }

        let mut node_data = match self
            .usage_provider
            .node_monitoring_data(&self.node_info.node_id, &self.node_info.partitions)
        {
            Ok(data) => data,
            Err(err) => {
                // Recoverable: skip this tick, the next one retries.
                log::error!("failed to get node monitoring data: err={err}");

                return;
            }
        };
        node_data.cpu = self.cpu_to_dmips(node_data.cpu);

        let sample = {
            let mut state = self.state.lock();

            let mut sample = NodeMonitoringSample {
                node_id: self.node_info.node_id.clone(),
                timestamp,
                data: node_data,
                instances: Vec::new(),
            };

            for (instance_id, data) in instance_samples {
                let Some(entry) = state.instances.get_mut(&instance_id) else {
                    // Stopped between snapshot and fold.
                    continue;
                };

                for processor in entry.alert_processors.iter_mut() {
                    Self::run_alert_processor(processor, &data, timestamp);
                }

                sample.instances.push(InstanceMonitoringSample {
                    instance_ident: entry.params.instance_ident.clone(),
                    data,
                });
            }

            if let Err(err) = state.average.update(&sample) {
                log::error!("failed to update average monitoring data: err={err}");
            }

            for processor in state.node_alert_processors.iter_mut() {
                Self::run_alert_processor(processor, &sample.data, timestamp);
            }

            if !state.send_monitoring {
                return;
            }

            Self::normalize_monitoring_data(&mut sample);

            sample
        };

        if let Err(err) = self.monitor_sender.send_monitoring_data(&sample) {
            log::error!("failed to send monitoring data: err={err}");
        }
    }

    fn run_alert_processor(
        processor: &mut AlertProcessor,
        data: &MonitoringData,
        timestamp: SystemTime,
    ) {
        let current_value = match Self::current_usage(processor.id(), data) {
            Ok(value) => value,
            Err(err) => {
                log::error!("failed to get resource usage: id={}, err={err}", processor.id());

                return;
            }
        };

        if let Err(err) = processor.check_alert_detection(current_value, timestamp) {
            log::error!("failed to check alert detection: id={}, err={err}", processor.id());
        }
    }

    fn current_usage(id: &ResourceIdentifier, data: &MonitoringData) -> Result<u64> {
        match id.resource {
            ResourceType::Cpu => Ok((data.cpu + 0.5) as u64),
            ResourceType::Ram => Ok(data.ram),
            ResourceType::Download => Ok(data.download),
            ResourceType::Upload => Ok(data.upload),
            ResourceType::Partition => {
                let Some(name) = &id.partition else {
                    return Err(Error::not_found("partition name is not set"));
                };

                data.partitions
                    .iter()
                    .find(|partition| &partition.name == name)
                    .map(|partition| partition.used_size)
                    .ok_or_else(|| Error::not_found(format!("partition {name}")))
            }
        }
    }

    /// Publication-time fixup: node figures never undercut the sum of the
    /// instances; node partitions never undercut the matching instance
    /// partition.
    fn normalize_monitoring_data(sample: &mut NodeMonitoringSample) {
        let mut total_cpu = 0.0;
        let mut total_ram = 0u64;
        let mut total_download = 0u64;
        let mut total_upload = 0u64;

        for instance in &sample.instances {
            total_cpu += instance.data.cpu;
            total_ram += instance.data.ram;
            total_download += instance.data.download;
            total_upload += instance.data.upload;

            for partition in &instance.data.partitions {
                if let Some(node_partition) = sample
                    .data
                    .partitions
                    .iter_mut()
                    .find(|known| known.name == partition.name)
                {
                    node_partition.used_size = node_partition.used_size.max(partition.used_size);
                }
            }
        }

        sample.data.cpu = sample.data.cpu.max(total_cpu);
        sample.data.ram = sample.data.ram.max(total_ram);
        sample.data.download = sample.data.download.max(total_download);
        sample.data.upload = sample.data.upload.max(total_upload);
    }

    fn cpu_to_dmips(&self, cpu_percentage: f64) -> f64 {
        cpu_percentage * self.node_info.max_dmips as f64 / 100.0
    }

    fn scale_rule(rule: &AlertRule, max_value: u64) -> AlertRule {
        AlertRule {
            min_timeout: rule.min_timeout,
            min_threshold: max_value * rule.min_threshold / 100,
            max_threshold: max_value * rule.max_threshold / 100,
        }
    }

    fn node_alert_template(&self, id: &ResourceIdentifier) -> AlertVariant {
        AlertVariant::NodeQuota(NodeQuotaAlert {
            node_id: self.node_info.node_id.clone(),
            parameter: id.parameter_name().to_string(),
            timestamp: SystemTime::UNIX_EPOCH,
            value: 0,
            state: QuotaAlertState::Raise,
        })
    }

    fn instance_alert_template(
        id: &ResourceIdentifier,
        instance_ident: &InstanceIdent,
    ) -> AlertVariant {
        AlertVariant::InstanceQuota(InstanceQuotaAlert {
            instance_ident: instance_ident.clone(),
            parameter: id.parameter_name().to_string(),
            timestamp: SystemTime::UNIX_EPOCH,
            value: 0,
            state: QuotaAlertState::Raise,
        })
    }

    /// Rebuilds the node-level alert processors from a node config.
    fn setup_node_alerts(&self, state: &mut EngineState, node_config: &NodeConfig) {
        log::debug!("setup system alerts");

        state.node_alert_processors.clear();

        let Some(rules) = &node_config.alert_rules else {
            return;
        };

        if let Some(rule) = &rules.cpu {
            let id = ResourceIdentifier::node(ResourceType::Cpu);
            let template = self.node_alert_template(&id);
            state.node_alert_processors.push(AlertProcessor::new(
                id,
                Self::scale_rule(rule, self.node_info.max_dmips),
                self.alert_sender.clone(),
                template,
            ));
        }

        if let Some(rule) = &rules.ram {
            let id = ResourceIdentifier::node(ResourceType::Ram);
            let template = self.node_alert_template(&id);
            state.node_alert_processors.push(AlertProcessor::new(
                id,
                Self::scale_rule(rule, self.node_info.total_ram),
                self.alert_sender.clone(),
                template,
            ));
        }

        for partition_rule in &rules.partitions {
            let Some(partition) = self
                .node_info
                .partitions
                .iter()
                .find(|partition| partition.name == partition_rule.name)
            else {
                log::warn!(
                    "failed to create alert processor for partition: name={}",
                    partition_rule.name
                );

                continue;
            };

            let id = ResourceIdentifier::node_partition(&partition_rule.name);
            let template = self.node_alert_template(&id);
            state.node_alert_processors.push(AlertProcessor::new(
                id,
                Self::scale_rule(&partition_rule.rule, partition.total_size),
                self.alert_sender.clone(),
                template,
            ));
        }

        if let Some(rule) = &rules.download {
            let id = ResourceIdentifier::node(ResourceType::Download);
            let template = self.node_alert_template(&id);
            state.node_alert_processors.push(AlertProcessor::new(
                id,
                rule.clone(),
                self.alert_sender.clone(),
                template,
            ));
        }

        if let Some(rule) = &rules.upload {
            let id = ResourceIdentifier::node(ResourceType::Upload);
            let template = self.node_alert_template(&id);
            state.node_alert_processors.push(AlertProcessor::new(
                id,
                rule.clone(),
                self.alert_sender.clone(),
                template,
            ));
        }
    }

    /// Builds the alert processors for one instance.
    fn build_instance_alerts(
        &self,
        instance_id: &str,
        instance_ident: &InstanceIdent,
        rules: &AlertRules,
        params: &InstanceMonitorParams,
    ) -> Vec<AlertProcessor> {
        log::debug!("setup instance alerts: instanceID={instance_id}");

        let mut processors = Vec::new();

        if let Some(rule) = &rules.cpu {
            let id = ResourceIdentifier::instance(ResourceType::Cpu, instance_id);
            let template = Self::instance_alert_template(&id, instance_ident);
            processors.push(AlertProcessor::new(
                id,
                Self::scale_rule(rule, self.node_info.max_dmips),
                self.alert_sender.clone(),
                template,
            ));
        }

        if let Some(rule) = &rules.ram {
            let id = ResourceIdentifier::instance(ResourceType::Ram, instance_id);
            let template = Self::instance_alert_template(&id, instance_ident);
            processors.push(AlertProcessor::new(
                id,
                Self::scale_rule(rule, self.node_info.total_ram),
                self.alert_sender.clone(),
                template,
            ));
        }

        for partition_rule in &rules.partitions {
            let Some(partition) = params
                .partitions
                .iter()
                .find(|partition| partition.name == partition_rule.name)
            else {
                log::warn!(
                    "failed to create alert processor for partition: name={}",
                    partition_rule.name
                );

                continue;
            };

            let id = ResourceIdentifier::instance_partition(&partition_rule.name, instance_id);
            let template = Self::instance_alert_template(&id, instance_ident);
            processors.push(AlertProcessor::new(
                id,
                Self::scale_rule(&partition_rule.rule, partition.total_size),
                self.alert_sender.clone(),
                template,
            ));
        }

        if let Some(rule) = &rules.download {
            let id = ResourceIdentifier::instance(ResourceType::Download, instance_id);
            let template = Self::instance_alert_template(&id, instance_ident);
            processors.push(AlertProcessor::new(
                id,
                rule.clone(),
                self.alert_sender.clone(),
                template,
            ));
        }

        if let Some(rule) = &rules.upload {
            let id = ResourceIdentifier::instance(ResourceType::Upload, instance_id);
            let template = Self::instance_alert_template(&id, instance_ident);
            processors.push(AlertProcessor::new(
                id,
                rule.clone(),
                self.alert_sender.clone(),
                template,
            ));
        }

        processors
    }
}
