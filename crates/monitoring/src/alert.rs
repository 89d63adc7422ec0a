// Path: crates/monitoring/src/alert.rs
//! Threshold alert processing with hysteresis.
//!
//! Each processor watches one resource. Crossing the upper threshold and
//! staying there for the rule timeout raises the alert; once raised, the
//! alert re-announces every timeout while usage stays above the lower
//! threshold, and falls only after the value has stayed below the lower
//! threshold for a full timeout.

use crate::error::Result;
use aegis_api::monitoring::AlertSender;
use aegis_types::alerts::{AlertVariant, QuotaAlertState};
use aegis_types::monitoring::{AlertRule, ResourceIdentifier};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Hysteresis alert state machine for one resource.
pub struct AlertProcessor {
    id: ResourceIdentifier,
    min_timeout: Duration,
    min_threshold: u64,
    max_threshold: u64,
    sender: Arc<dyn AlertSender>,
    template: AlertVariant,
    condition: bool,
    max_cross_time: Option<SystemTime>,
    min_cross_time: Option<SystemTime>,
}

fn elapsed(since: Option<SystemTime>, now: SystemTime) -> Duration {
    since
        .and_then(|since| now.duration_since(since).ok())
        .unwrap_or_default()
}

impl AlertProcessor {
    /// Creates a processor for the identified resource.
    pub fn new(
        id: ResourceIdentifier,
        rule: AlertRule,
        sender: Arc<dyn AlertSender>,
        template: AlertVariant,
    ) -> Self {
        log::debug!(
            "create alert processor: id={id}, minThreshold={}, maxThreshold={}, minTimeout={:?}",
            rule.min_threshold,
            rule.max_threshold,
            rule.min_timeout
        );

        Self {
            id,
            min_timeout: rule.min_timeout,
            min_threshold: rule.min_threshold,
            max_threshold: rule.max_threshold,
            sender,
            template,
            condition: false,
            max_cross_time: None,
            min_cross_time: None,
        }
    }

    /// Returns the identifier of the watched resource.
    pub fn id(&self) -> &ResourceIdentifier {
        &self.id
    }

    /// Feeds one sample into the state machine.
    pub fn check_alert_detection(&mut self, current_value: u64, current_time: SystemTime) -> Result<()> {
        if !self.condition {
            self.handle_max_threshold(current_value, current_time)
        } else {
            self.handle_min_threshold(current_value, current_time)
        }
    }

    fn handle_max_threshold(&mut self, current_value: u64, current_time: SystemTime) -> Result<()> {
        let mut result = Ok(());

        if current_value >= self.max_threshold && self.max_cross_time.is_none() {
            log::info!(
                "max threshold crossed: id={}, maxThreshold={}, value={current_value}",
                self.id,
                self.max_threshold
            );

            self.max_cross_time = Some(current_time);
        }

        if current_value >= self.max_threshold
            && self.max_cross_time.is_some()
            && elapsed(self.max_cross_time, current_time) >= self.min_timeout
        {
            let state = QuotaAlertState::Raise;

            log::info!(
                "resource alert: id={}, value={current_value}, state={state}",
                self.id
            );

            self.condition = true;
            self.max_cross_time = Some(current_time);
            self.min_cross_time = None;

            if let Err(err) = self.send_alert(current_value, current_time, state) {
                result = Err(err);
            }
        }

        if current_value < self.max_threshold && self.max_cross_time.is_some() {
            self.max_cross_time = None;
        }

        result
    }

    fn handle_min_threshold(&mut self, current_value: u64, current_time: SystemTime) -> Result<()> {
        if current_value >= self.min_threshold {
            self.min_cross_time = None;

            if elapsed(self.max_cross_time, current_time) >= self.min_timeout {
                let state = QuotaAlertState::Continue;

                self.max_cross_time = Some(current_time);

                log::info!(
                    "resource alert: id={}, value={current_value}, state={state}",
                    self.id
                );

                self.send_alert(current_value, current_time, state)?;
            }

            return Ok(());
        }

        if self.min_cross_time.is_none() {
            log::info!(
                "min threshold crossed: id={}, value={current_value}, minThreshold={}",
                self.id,
                self.min_threshold
            );

            self.min_cross_time = Some(current_time);

            return Ok(());
        }

        if elapsed(self.min_cross_time, current_time) >= self.min_timeout {
            let state = QuotaAlertState::Fall;

            log::info!(
                "resource alert: id={}, value={current_value}, state={state}",
                self.id
            );

            self.condition = false;
            self.min_cross_time = Some(current_time);
            self.max_cross_time = None;

            self.send_alert(current_value, current_time, state)?;
        }

        Ok(())
    }

    fn send_alert(
        &self,
        current_value: u64,
        current_time: SystemTime,
        state: QuotaAlertState,
    ) -> Result<()> {
        let alert = self.template.stamped(current_value, current_time, state);

        if let Err(err) = self.sender.send_alert(&alert) {
            log::error!("failed to send alert: {err}");

            return Err(err);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_types::alerts::NodeQuotaAlert;
    use aegis_types::monitoring::ResourceType;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingSender {
        alerts: Mutex<Vec<AlertVariant>>,
        fail: Mutex<bool>,
    }

    impl AlertSender for RecordingSender {
        fn send_alert(&self, alert: &AlertVariant) -> Result<()> {
            if *self.fail.lock() {
                return Err(crate::error::Error::failed("sender down"));
            }

            self.alerts.lock().push(alert.clone());

            Ok(())
        }
    }

    fn processor(sender: Arc<RecordingSender>) -> AlertProcessor {
        let rule = AlertRule {
            min_timeout: Duration::from_secs(2),
            min_threshold: 50,
            max_threshold: 85,
        };
        let template = AlertVariant::NodeQuota(NodeQuotaAlert {
            node_id: "node1".into(),
            parameter: "cpu".into(),
            timestamp: SystemTime::UNIX_EPOCH,
            value: 0,
            state: QuotaAlertState::Raise,
        });

        AlertProcessor::new(
            ResourceIdentifier::node(ResourceType::Cpu),
            rule,
            sender,
            template,
        )
    }

    fn at(seconds: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(seconds)
    }

    #[test]
    fn test_raise_continue_fall_trace() {
        let sender = Arc::new(RecordingSender::default());
        let mut processor = processor(sender.clone());

        // (t, value): 0s/30, 1s/90, 3s/95, 4s/93, 6s/70, 8s/40, 10s/40.
        for (time, value) in [(0, 30), (1, 90), (3, 95), (4, 93), (6, 70), (8, 40), (10, 40)] {
            processor.check_alert_detection(value, at(time)).unwrap();
        }

        let alerts = sender.alerts.lock();
        let summary: Vec<(u64, QuotaAlertState, SystemTime)> = alerts
            .iter()
            .map(|alert| {
                let AlertVariant::NodeQuota(alert) = alert else {
                    panic!("unexpected variant");
                };
                (alert.value, alert.state, alert.timestamp)
            })
            .collect();

        assert_eq!(
            summary,
            vec![
                (95, QuotaAlertState::Raise, at(3)),
                (70, QuotaAlertState::Continue, at(6)),
                (40, QuotaAlertState::Fall, at(10)),
            ]
        );
    }

    #[test]
    fn test_short_spike_does_not_raise() {
        let sender = Arc::new(RecordingSender::default());
        let mut processor = processor(sender.clone());

        // Crosses up but drops below max before the timeout expires.
        processor.check_alert_detection(90, at(0)).unwrap();
        processor.check_alert_detection(80, at(1)).unwrap();
        processor.check_alert_detection(90, at(2)).unwrap();

        assert!(sender.alerts.lock().is_empty());
    }

    #[test]
    fn test_consecutive_raises_separated_by_timeout() {
        let sender = Arc::new(RecordingSender::default());
        let mut processor = processor(sender.clone());

        // Stay above max for a long stretch: one raise, then continues at
        // timeout intervals.
        for time in 0..=8 {
            processor.check_alert_detection(90, at(time)).unwrap();
        }

        let alerts = sender.alerts.lock();
        let mut last_announce: Option<SystemTime> = None;
        for alert in alerts.iter() {
            let AlertVariant::NodeQuota(alert) = alert else {
                panic!("unexpected variant");
            };
            if let Some(previous) = last_announce {
                assert!(alert.timestamp.duration_since(previous).unwrap() >= Duration::from_secs(2));
            }
            last_announce = Some(alert.timestamp);
        }

        assert_eq!(alerts.iter().filter(|a| a.state() == QuotaAlertState::Raise).count(), 1);
        assert!(alerts.len() >= 3);
    }

    #[test]
    fn test_sender_failure_keeps_state() {
        let sender = Arc::new(RecordingSender::default());
        let mut processor = processor(sender.clone());

        *sender.fail.lock() = true;

        processor.check_alert_detection(90, at(0)).unwrap();
        let result = processor.check_alert_detection(90, at(2));
        assert!(result.is_err());

        // The raise happened despite the send failure; recovery emits a
        // fall, not another raise.
        *sender.fail.lock() = false;
        processor.check_alert_detection(40, at(3)).unwrap();
        processor.check_alert_detection(40, at(5)).unwrap();

        let alerts = sender.alerts.lock();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].state(), QuotaAlertState::Fall);
    }
}
