use std::time::Duration;

use serde::Deserialize;

use crate::net::secs;

/// Constants for remote actor smoothing. Distances are in tiles, speeds in
/// tiles per second.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub idle_threshold_secs: f32,
    /// A broadcast implying more than this multiple of `max_run_speed` is a
    /// teleport.
    pub teleport_speed_factor: f32,
    pub max_run_speed: f32,
    pub walk_speed: f32,
    pub lag_window_alpha: f32,
    pub initial_lag_window_secs: f32,
    pub max_lag_window_secs: f32,
    /// Warp animations the host never finishes are completed after this.
    pub warp_timeout_secs: f32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            idle_threshold_secs: 1.0,
            teleport_speed_factor: 2.0,
            max_run_speed: 4.0,
            walk_speed: 2.0,
            lag_window_alpha: 0.2,
            initial_lag_window_secs: 0.1,
            max_lag_window_secs: 1.0,
            warp_timeout_secs: 3.0,
        }
    }
}

impl SyncConfig {
    pub fn idle_threshold(&self) -> Duration {
        secs(self.idle_threshold_secs)
    }

    pub fn warp_timeout(&self) -> Duration {
        secs(self.warp_timeout_secs)
    }

    pub fn teleport_speed(&self) -> f32 {
        self.teleport_speed_factor * self.max_run_speed
    }
}
