//! Queue configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Lease timeout handed to `dequeue` by workers, in seconds.
    #[serde(default = "default_lease_timeout")]
    pub lease_timeout_secs: i64,

    /// Interval between two expiry sweeps, in milliseconds.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_ms: u64,

    /// Drain the retry segment before the primary segment.
    #[serde(default = "default_retry_first")]
    pub retry_first: bool,
}

fn default_lease_timeout() -> i64 {
    300
}

fn default_sweep_interval() -> u64 {
    5_000
}

fn default_retry_first() -> bool {
    true
}

impl QueueConfig {
    /// Sweep interval as a `Duration`.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms.max(1))
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            lease_timeout_secs: default_lease_timeout(),
            sweep_interval_ms: default_sweep_interval(),
            retry_first: default_retry_first(),
        }
    }
}
