use super::ConfigError;
use async_trait::async_trait;
use std::time::Duration;

pub const TICK_INTERVAL_KEY: &str = "TICK_INTERVAL";
pub const HUB_CONNECTION_STRING_KEY: &str = "HUB_CONNECTION_STRING";
pub const HUB_NAME_KEY: &str = "HUB_NAME";

/// Interval used whenever the configured one is missing or unusable
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(60);

/// Key/value pull interface to the runtime settings store
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get_setting(&self, key: &str) -> Result<String, ConfigError>;
}

/// Supplies the tick interval for the next producer cycle
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait IntervalSource: Send + Sync {
    fn tick_interval(&self) -> Result<Duration, ConfigError>;
}

/// Immutable view of the runtime settings; replaced wholesale on refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSnapshot {
    pub tick_interval: Duration,
    pub hub_connection: String,
    pub hub_name: String,
}
