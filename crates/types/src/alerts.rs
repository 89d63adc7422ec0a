// Path: crates/types/src/alerts.rs
//! Quota alert records emitted by the alert processors.

use crate::instance::InstanceIdent;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

/// Phase of a quota alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuotaAlertState {
    /// Threshold crossed upward and held for the rule timeout.
    Raise,
    /// Still above the lower bound after a raised alert, re-announced once
    /// per rule timeout.
    Continue,
    /// Dropped below the lower bound and held for the rule timeout.
    Fall,
}

impl fmt::Display for QuotaAlertState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Raise => "raise",
            Self::Continue => "continue",
            Self::Fall => "fall",
        };

        f.write_str(name)
    }
}

/// Node-level quota alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeQuotaAlert {
    /// Node the alert originates from.
    pub node_id: String,
    /// Name of the offending resource (resource kind or partition name).
    pub parameter: String,
    /// Time of the sample that produced the alert.
    pub timestamp: SystemTime,
    /// The sampled value.
    pub value: u64,
    /// Alert phase.
    pub state: QuotaAlertState,
}

/// Instance-level quota alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceQuotaAlert {
    /// Instance the alert originates from.
    pub instance_ident: InstanceIdent,
    /// Name of the offending resource (resource kind or partition name).
    pub parameter: String,
    /// Time of the sample that produced the alert.
    pub timestamp: SystemTime,
    /// The sampled value.
    pub value: u64,
    /// Alert phase.
    pub state: QuotaAlertState,
}

/// Sum of all alert record shapes the monitoring engine can emit.
///
/// Alert processors hold one of these as a template with identity fields
/// filled in; emission stamps timestamp, value, and state onto a copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AlertVariant {
    /// Node quota alert.
    NodeQuota(NodeQuotaAlert),
    /// Instance quota alert.
    InstanceQuota(InstanceQuotaAlert),
}

impl AlertVariant {
    /// Returns a copy of this template with the dynamic fields stamped.
    pub fn stamped(&self, value: u64, timestamp: SystemTime, state: QuotaAlertState) -> Self {
        match self {
            Self::NodeQuota(alert) => Self::NodeQuota(NodeQuotaAlert {
                timestamp,
                value,
                state,
                ..alert.clone()
            }),
            Self::InstanceQuota(alert) => Self::InstanceQuota(InstanceQuotaAlert {
                timestamp,
                value,
                state,
                ..alert.clone()
            }),
        }
    }

    /// Returns the alert phase.
    pub fn state(&self) -> QuotaAlertState {
        match self {
            Self::NodeQuota(alert) => alert.state,
            Self::InstanceQuota(alert) => alert.state,
        }
    }

    /// Returns the sampled value carried by the alert.
    pub fn value(&self) -> u64 {
        match self {
            Self::NodeQuota(alert) => alert.value,
            Self::InstanceQuota(alert) => alert.value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    #[test]
    fn test_stamped_keeps_identity_fields() {
        let template = AlertVariant::NodeQuota(NodeQuotaAlert {
            node_id: "node1".into(),
            parameter: "cpu".into(),
            timestamp: SystemTime::UNIX_EPOCH,
            value: 0,
            state: QuotaAlertState::Raise,
        });

        let at = SystemTime::UNIX_EPOCH + Duration::from_secs(3);
        let alert = template.stamped(95, at, QuotaAlertState::Raise);

        match alert {
            AlertVariant::NodeQuota(alert) => {
                assert_eq!(alert.node_id, "node1");
                assert_eq!(alert.parameter, "cpu");
                assert_eq!(alert.timestamp, at);
                assert_eq!(alert.value, 95);
                assert_eq!(alert.state, QuotaAlertState::Raise);
            }
            other => panic!("unexpected alert variant: {other:?}"),
        }
    }
}
