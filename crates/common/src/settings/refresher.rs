use super::{
    parse_duration, ConfigError, ConfigSnapshot, IntervalSource, SettingsStore,
    DEFAULT_TICK_INTERVAL, HUB_CONNECTION_STRING_KEY, HUB_NAME_KEY, TICK_INTERVAL_KEY,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// Pulls runtime settings from a [`SettingsStore`] and publishes them as
/// immutable snapshots.
///
/// Readers never block a refresh: each refresh builds a complete
/// [`ConfigSnapshot`] and swaps it in. A refresh that fails leaves the
/// previous snapshot in place.
pub struct ConfigRefresher {
    store: Arc<dyn SettingsStore>,
    current: watch::Sender<Option<Arc<ConfigSnapshot>>>,
}

impl ConfigRefresher {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        let (current, _) = watch::channel(None);
        Self { store, current }
    }

    /// Read every setting and replace the current snapshot
    pub async fn refresh(&self) -> Result<Arc<ConfigSnapshot>, ConfigError> {
        match self.fetch().await {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                self.current.send_replace(Some(Arc::clone(&snapshot)));
                info!(
                    tick_interval_ms = snapshot.tick_interval.as_millis() as u64,
                    hub_name = %snapshot.hub_name,
                    "Configuration refreshed"
                );
                Ok(snapshot)
            }
            Err(e) => {
                warn!(error = %e, "Configuration refresh failed, keeping previous settings");
                Err(e)
            }
        }
    }

    /// Latest snapshot, if a refresh has ever succeeded
    pub fn snapshot(&self) -> Option<Arc<ConfigSnapshot>> {
        self.current.borrow().clone()
    }

    async fn fetch(&self) -> Result<ConfigSnapshot, ConfigError> {
        let tick_interval = match self.store.get_setting(TICK_INTERVAL_KEY).await {
            Ok(raw) => interval_or_default(&raw),
            Err(ConfigError::MissingSetting(_)) => {
                warn!(
                    default_secs = DEFAULT_TICK_INTERVAL.as_secs(),
                    "Tick interval not configured, using default"
                );
                DEFAULT_TICK_INTERVAL
            }
            Err(e) => return Err(e),
        };

        let hub_connection = self.required(HUB_CONNECTION_STRING_KEY).await?;
        let hub_name = self.required(HUB_NAME_KEY).await?;

        Ok(ConfigSnapshot {
            tick_interval,
            hub_connection,
            hub_name,
        })
    }

    async fn required(&self, key: &str) -> Result<String, ConfigError> {
        let value = self.store.get_setting(key).await?;
        let value = value.trim();
        if value.is_empty() {
            return Err(ConfigError::EmptySetting(key.to_string()));
        }
        Ok(value.to_string())
    }
}

impl IntervalSource for ConfigRefresher {
    fn tick_interval(&self) -> Result<Duration, ConfigError> {
        self.current
            .borrow()
            .as_ref()
            .map(|snapshot| snapshot.tick_interval)
            .ok_or(ConfigError::NotLoaded)
    }
}

fn interval_or_default(raw: &str) -> Duration {
    match parse_duration(raw) {
        Ok(interval) if !interval.is_zero() => interval,
        Ok(_) => {
            warn!(
                value = raw,
                default_secs = DEFAULT_TICK_INTERVAL.as_secs(),
                "Tick interval is zero, using default"
            );
            DEFAULT_TICK_INTERVAL
        }
        Err(e) => {
            warn!(
                error = %e,
                default_secs = DEFAULT_TICK_INTERVAL.as_secs(),
                "Tick interval is not a valid duration, using default"
            );
            DEFAULT_TICK_INTERVAL
        }
    }
}
