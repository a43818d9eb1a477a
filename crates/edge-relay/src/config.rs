//! Relay configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Relay configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Keep-alive period in seconds. An idle relay is restarted this often.
    pub keep_alive_interval_secs: u64,
    /// Commands older than this when observed are acknowledged without
    /// being forwarded. `None` forwards regardless of age.
    pub stale_command_window_secs: Option<u64>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            keep_alive_interval_secs: 30,
            stale_command_window_secs: None,
        }
    }
}

impl RelayConfig {
    pub fn keep_alive_interval(&self) -> Duration {
        Duration::from_secs(self.keep_alive_interval_secs.max(1))
    }

    pub fn stale_command_window(&self) -> Option<Duration> {
        self.stale_command_window_secs.map(Duration::from_secs)
    }
}
