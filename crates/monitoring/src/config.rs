// Path: crates/monitoring/src/config.rs
//! Monitoring engine configuration.

use std::time::Duration;

/// Timing configuration of the resource monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Sampling cadence.
    pub poll_period: Duration,
    /// Width of the moving-average window. The filter window count is
    /// `average_window / poll_period`, clamped to at least one.
    pub average_window: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_period: Duration::from_secs(1),
            average_window: Duration::from_secs(60),
        }
    }
}

impl Config {
    /// Returns the moving-average window count derived from the
    /// configured durations.
    pub fn window_count(&self) -> usize {
        if self.poll_period.is_zero() {
            return 1;
        }

        let count = (self.average_window.as_nanos() / self.poll_period.as_nanos()) as usize;
        count.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_count() {
        let config = Config {
            poll_period: Duration::from_secs(1),
            average_window: Duration::from_secs(4),
        };
        assert_eq!(config.window_count(), 4);

        // Sub-period windows clamp to one.
        let config = Config {
            poll_period: Duration::from_secs(10),
            average_window: Duration::from_secs(1),
        };
        assert_eq!(config.window_count(), 1);
    }
}
