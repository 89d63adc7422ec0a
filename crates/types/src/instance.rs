// Path: crates/types/src/instance.rs
//! Workload instance identity and lifecycle state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Uniquely identifies a workload instance on a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceIdent {
    /// Identifier of the service the instance belongs to.
    pub service_id: String,
    /// Identifier of the subject the instance runs for.
    pub subject_id: String,
    /// Instance index within the service/subject pair.
    pub instance: u64,
}

impl InstanceIdent {
    /// Creates a new instance identity.
    pub fn new(service_id: impl Into<String>, subject_id: impl Into<String>, instance: u64) -> Self {
        Self {
            service_id: service_id.into(),
            subject_id: subject_id.into(),
            instance,
        }
    }
}

impl fmt::Display for InstanceIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.service_id, self.subject_id, self.instance)
    }
}

/// Lifecycle state of a workload instance as reported by the orchestrator.
///
/// The monitor uses this to decide how loudly to complain when usage data
/// for an instance is unavailable: only `Active` instances log at error
/// level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstanceState {
    /// The instance is being started.
    Activating,
    /// The instance is running.
    Active,
    /// The instance has been stopped.
    Stopped,
    /// The instance terminated abnormally.
    Failed,
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Activating => "activating",
            Self::Active => "active",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        };

        f.write_str(name)
    }
}
