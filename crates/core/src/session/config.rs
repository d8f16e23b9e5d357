use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::actor::SyncConfig;
use crate::net::{ProcessorConfig, secs};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub username: String,
    /// Sent as raw bytes in `login` and `authorize`.
    pub identity: String,
    /// Free-form string forwarded with `login`.
    pub join_data: String,
    pub position_rate_hz: f32,
    /// Delay between `version_request` resends until the server answers.
    pub version_retry_secs: f32,
    /// Persisted server assets live under `<cache_root>/<server address>/`.
    /// Memory-only when unset.
    pub cache_root: Option<PathBuf>,
    /// Resolves non-server asset paths.
    pub local_asset_root: Option<PathBuf>,
    pub processor: ProcessorConfig,
    pub sync: SyncConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            username: "Anonymous".to_string(),
            identity: String::new(),
            join_data: String::new(),
            position_rate_hz: 20.0,
            version_retry_secs: 0.05,
            cache_root: None,
            local_asset_root: None,
            processor: ProcessorConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Zero or negative rates disable position updates.
    pub fn position_interval(&self) -> Option<Duration> {
        (self.position_rate_hz > 0.0).then(|| secs(1.0 / self.position_rate_hz))
    }

    pub fn version_retry(&self) -> Duration {
        secs(self.version_retry_secs)
    }
}
