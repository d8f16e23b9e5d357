use std::time::Duration;

use serde::Deserialize;

use super::envelope::MAX_PAYLOAD_SIZE;
use super::stats::LossSimulation;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Liveness window: no inbound frame for this long means the link is dead.
    pub timeout_secs: f32,
    pub retry_delay_secs: f32,
    pub max_retry_delay_secs: f32,
    pub background_retry_factor: f32,
    pub heartbeat_interval_secs: f32,
    pub max_payload_size: usize,
    pub loss_simulation: Option<LossSimulation>,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15.0,
            retry_delay_secs: 0.05,
            max_retry_delay_secs: 1.0,
            background_retry_factor: 4.0,
            heartbeat_interval_secs: 1.0,
            max_payload_size: MAX_PAYLOAD_SIZE,
            loss_simulation: None,
        }
    }
}

impl ProcessorConfig {
    pub fn timeout(&self) -> Duration {
        secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        secs(self.retry_delay_secs)
    }

    pub fn max_retry_delay(&self) -> Duration {
        secs(self.max_retry_delay_secs)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        secs(self.heartbeat_interval_secs)
    }
}

pub(crate) fn secs(value: f32) -> Duration {
    Duration::try_from_secs_f32(value.max(0.0)).unwrap_or(Duration::MAX)
}
