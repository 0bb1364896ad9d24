use super::{ConfigError, SettingsStore};
use async_trait::async_trait;
use config::{Config, Environment, File};
use std::path::PathBuf;
use tracing::debug;

const ENV_OVERRIDE_PREFIX: &str = "PRODUCER_SETTING";

/// Settings store backed by a yaml, toml or json file.
///
/// The file is re-read on every lookup so a refresh observes edits made while
/// the process runs. Environment variables prefixed `PRODUCER_SETTING_`
/// override file values, e.g. `PRODUCER_SETTING_TICK_INTERVAL=5s`.
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Result<Config, ConfigError> {
        Config::builder()
            .add_source(File::from(self.path.as_path()).required(true))
            .add_source(Environment::with_prefix(ENV_OVERRIDE_PREFIX))
            .build()
            .map_err(|source| ConfigError::Source {
                path: self.path.display().to_string(),
                source,
            })
    }
}

#[async_trait]
impl SettingsStore for FileSettingsStore {
    async fn get_setting(&self, key: &str) -> Result<String, ConfigError> {
        let settings = self.load()?;

        // Environment keys arrive lowercased; file keys may keep their case
        let value = settings
            .get_string(&key.to_lowercase())
            .or_else(|_| settings.get_string(key))
            .map_err(|_| ConfigError::MissingSetting(key.to_string()))?;

        debug!(key, path = %self.path.display(), "Read setting");
        Ok(value)
    }
}
