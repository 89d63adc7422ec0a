// Path: crates/monitoring/src/average.rs
//! Moving-average filter over monitoring samples.
//!
//! State is kept scaled by the window count W so a single-sample update
//! needs no history buffer: the first sample initializes the state to
//! `value × W`, every later sample folds in as `state − state/W + value`,
//! and reads divide by W (rounding half-up for integer metrics).

use crate::error::{Error, Result};
use aegis_types::instance::InstanceIdent;
use aegis_types::monitoring::{
    InstanceMonitoringSample, MonitoringData, NodeMonitoringSample, PartitionUsage,
};
use std::collections::HashMap;

/// Upper bound on concurrently averaged instances.
pub const MAX_INSTANCES: usize = 64;

#[derive(Debug, Clone, Default)]
struct AverageState {
    initialized: bool,
    data: MonitoringData,
}

/// Per-metric moving average for the node and every registered instance.
#[derive(Debug)]
pub struct Average {
    window: usize,
    node: AverageState,
    instances: HashMap<InstanceIdent, AverageState>,
}

fn scaled_update_u64(value: &mut u64, new_value: u64, window: usize, initialized: bool) {
    if !initialized {
        *value = new_value * window as u64;
    } else {
        *value = *value - scaled_read_u64(*value, window) + new_value;
    }
}

fn scaled_update_f64(value: &mut f64, new_value: f64, window: usize, initialized: bool) {
    if !initialized {
        *value = new_value * window as f64;
    } else {
        *value = *value - *value / window as f64 + new_value;
    }
}

fn scaled_read_u64(value: u64, window: usize) -> u64 {
    // Round half-up, matching the filter's integer read contract.
    (value as f64 / window as f64 + 0.5) as u64
}

impl Average {
    /// Creates a filter with the given window count, clamped to ≥ 1.
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            node: AverageState::default(),
            instances: HashMap::new(),
        }
    }

    /// Folds one node sample (including its instance entries) into the
    /// filter. Every instance in the sample must have been registered.
    pub fn update(&mut self, sample: &NodeMonitoringSample) -> Result<()> {
        Self::update_data(&mut self.node, &sample.data, self.window);

        for instance in &sample.instances {
            let Some(state) = self.instances.get_mut(&instance.instance_ident) else {
                log::error!("instance not found: ident={}", instance.instance_ident);

                return Err(Error::not_found(format!(
                    "instance {}",
                    instance.instance_ident
                )));
            };

            Self::update_data(state, &instance.data, self.window);
        }

        Ok(())
    }

    /// Returns the averaged node and instance data.
    pub fn data(&self) -> NodeMonitoringSample {
        let mut sample = NodeMonitoringSample {
            data: Self::read_data(&self.node, self.window),
            ..NodeMonitoringSample::default()
        };

        for (ident, state) in &self.instances {
            sample.instances.push(InstanceMonitoringSample {
                instance_ident: ident.clone(),
                data: Self::read_data(state, self.window),
            });
        }

        sample
    }

    /// Registers an instance; its filter starts zeroed and uninitialized.
    pub fn start_instance(&mut self, ident: &InstanceIdent) -> Result<()> {
        log::debug!("start average instance monitoring: ident={ident}");

        if self.instances.contains_key(ident) {
            return Err(Error::already_exists("instance monitoring already started"));
        }
        if self.instances.len() >= MAX_INSTANCES {
            return Err(Error::NoMemory("instance capacity exceeded".into()));
        }

        self.instances.insert(ident.clone(), AverageState::default());

        Ok(())
    }

    /// Removes a registered instance.
    pub fn stop_instance(&mut self, ident: &InstanceIdent) -> Result<()> {
        log::debug!("stop average instance monitoring: ident={ident}");

        self.instances
            .remove(ident)
            .map(|_| ())
            .ok_or_else(|| Error::not_found(format!("instance {ident}")))
    }

    fn update_data(state: &mut AverageState, new_data: &MonitoringData, window: usize) {
        let initialized = state.initialized;
        let data = &mut state.data;

        scaled_update_f64(&mut data.cpu, new_data.cpu, window, initialized);
        scaled_update_u64(&mut data.ram, new_data.ram, window, initialized);
        scaled_update_u64(&mut data.download, new_data.download, window, initialized);
        scaled_update_u64(&mut data.upload, new_data.upload, window, initialized);

        // Initialization is tracked per series: a partition appearing for
        // the first time seeds scaled by the window, no matter how many
        // samples the entity itself has taken.
        for partition in &new_data.partitions {
            match data
                .partitions
                .iter()
                .position(|known| known.name == partition.name)
            {
                Some(index) => {
                    if let Some(entry) = data.partitions.get_mut(index) {
                        scaled_update_u64(&mut entry.used_size, partition.used_size, window, true);
                    }
                }
                None => {
                    // First sighting: metadata passes through unchanged.
                    data.partitions.push(PartitionUsage {
                        used_size: partition.used_size * window as u64,
                        ..partition.clone()
                    });
                }
            }
        }

        state.initialized = true;
    }

    fn read_data(state: &AverageState, window: usize) -> MonitoringData {
        let mut data = MonitoringData {
            cpu: state.data.cpu / window as f64,
            ram: scaled_read_u64(state.data.ram, window),
            download: scaled_read_u64(state.data.download, window),
            upload: scaled_read_u64(state.data.upload, window),
            partitions: Vec::with_capacity(state.data.partitions.len()),
        };

        for partition in &state.data.partitions {
            data.partitions.push(PartitionUsage {
                used_size: scaled_read_u64(partition.used_size, window),
                ..partition.clone()
            });
        }

        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_sample(cpu: f64, ram: u64, download: u64, upload: u64) -> NodeMonitoringSample {
        NodeMonitoringSample {
            data: MonitoringData {
                cpu,
                ram,
                download,
                upload,
                partitions: Vec::new(),
            },
            ..NodeMonitoringSample::default()
        }
    }

    #[test]
    fn test_first_sample_initializes() {
        let mut average = Average::new(3);
        average.update(&node_sample(0.0, 600, 300, 300)).unwrap();

        let data = average.data().data;
        assert_eq!(data.cpu, 0.0);
        assert_eq!(data.ram, 600);
        assert_eq!(data.download, 300);
        assert_eq!(data.upload, 300);
    }

    #[test]
    fn test_three_sample_trace() {
        // Mirrors the reference trace: window 3, node samples
        // (0,600,300,300), (900,300,0,300), (1200,200,200,0).
        let mut average = Average::new(3);

        average.update(&node_sample(0.0, 600, 300, 300)).unwrap();
        average.update(&node_sample(900.0, 300, 0, 300)).unwrap();
        let data = average.data().data;
        assert_eq!(data.cpu, 300.0);
        assert_eq!(data.ram, 500);
        assert_eq!(data.download, 200);
        assert_eq!(data.upload, 300);

        average.update(&node_sample(1200.0, 200, 200, 0)).unwrap();
        let data = average.data().data;
        assert_eq!(data.cpu, 600.0);
        assert_eq!(data.ram, 400);
        assert_eq!(data.download, 200);
        assert_eq!(data.upload, 200);
    }

    #[test]
    fn test_constant_stream_converges() {
        let mut average = Average::new(4);

        average.update(&node_sample(0.0, 0, 0, 0)).unwrap();
        for _ in 0..64 {
            average.update(&node_sample(80.0, 1000, 10, 20)).unwrap();
        }

        let data = average.data().data;
        assert!((data.cpu - 80.0).abs() < 0.5);
        assert_eq!(data.ram, 1000);
        assert_eq!(data.download, 10);
        assert_eq!(data.upload, 20);
    }

    #[test]
    fn test_window_four_cpu_trace() {
        // Constant 100 for four ticks, then zero: the average reads
        // (3·100 + 0)/4 = 75.
        let mut average = Average::new(4);

        for _ in 0..4 {
            average.update(&node_sample(100.0, 0, 0, 0)).unwrap();
        }
        average.update(&node_sample(0.0, 0, 0, 0)).unwrap();

        assert_eq!(average.data().data.cpu, 75.0);
    }

    #[test]
    fn test_partition_merge_by_name() {
        let mut average = Average::new(2);

        let mut sample = node_sample(0.0, 0, 0, 0);
        sample.data.partitions.push(PartitionUsage {
            name: "disk".into(),
            path: "/var/disk".into(),
            total_size: 512,
            used_size: 100,
        });
        average.update(&sample).unwrap();

        // A partition appearing later is appended and averaged from its
        // first value.
        let mut sample = node_sample(0.0, 0, 0, 0);
        sample.data.partitions.push(PartitionUsage {
            name: "disk".into(),
            path: "/var/disk".into(),
            total_size: 512,
            used_size: 300,
        });
        sample.data.partitions.push(PartitionUsage {
            name: "state".into(),
            path: "/var/state".into(),
            total_size: 128,
            used_size: 64,
        });
        average.update(&sample).unwrap();

        let data = average.data().data;
        assert_eq!(data.partitions.len(), 2);
        assert_eq!(data.partitions[0].name, "disk");
        assert_eq!(data.partitions[0].used_size, 200);
        assert_eq!(data.partitions[0].total_size, 512);
        assert_eq!(data.partitions[0].path, "/var/disk");
        // The late-appearing series starts from its own first sample, so
        // the first read reports the raw value, not a half-window share.
        assert_eq!(data.partitions[1].name, "state");
        assert_eq!(data.partitions[1].used_size, 64);
        assert_eq!(data.partitions[1].total_size, 128);
    }

    #[test]
    fn test_instance_lifecycle() {
        let mut average = Average::new(2);
        let ident = InstanceIdent::new("service0", "subject0", 0);

        average.start_instance(&ident).unwrap();
        let err = average.start_instance(&ident).unwrap_err();
        assert_eq!(
            aegis_api::error::ErrorCode::code(&err),
            "ALREADY_EXISTS"
        );

        let mut sample = node_sample(0.0, 0, 0, 0);
        sample.instances.push(InstanceMonitoringSample {
            instance_ident: ident.clone(),
            data: MonitoringData {
                cpu: 50.0,
                ram: 100,
                ..MonitoringData::default()
            },
        });
        average.update(&sample).unwrap();

        let snapshot = average.data();
        assert_eq!(snapshot.instances.len(), 1);
        assert_eq!(snapshot.instances[0].data.ram, 100);

        average.stop_instance(&ident).unwrap();
        assert!(average.stop_instance(&ident).is_err());

        // Updating with an unregistered instance fails.
        assert!(average.update(&sample).is_err());
    }
}
