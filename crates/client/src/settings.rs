use std::path::Path;

use serde::Deserialize;

use overnet::SessionConfig;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub server: Option<String>,
    pub tick_rate: u32,
    pub session: SessionConfig,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server: None,
            tick_rate: 60,
            session: SessionConfig::default(),
        }
    }
}

impl ClientSettings {
    /// Defaults, then the optional TOML file, then `OVERNET_*` variables
    /// (`OVERNET_SESSION__USERNAME=...`).
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }

        builder
            .add_source(
                config::Environment::with_prefix("OVERNET")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
