use common::telemetry::{LogFormat, TelemetryConfig};
use config::{Config, ConfigError, Environment, File};
use control_api::ControlServerConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Base name of the optional bootstrap file looked up in the working directory
const DEFAULT_CONFIG_FILE: &str = "config";

/// Bootstrap configuration: everything needed before the runtime settings
/// store can be read.
///
/// Sources, highest priority first: `PRODUCER_*` environment variables, then
/// `config.yaml` (or `.toml`/`.json`) in the working directory.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Console log format (json or pretty)
    #[serde(default = "default_log_format")]
    pub log_format: String,

    // HTTP control API
    #[serde(default = "default_http_host")]
    pub http_host: String,

    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Location of the runtime settings file (tick interval, hub connection)
    #[serde(default = "default_config_source")]
    pub config_source: String,

    // Message hub
    /// Timeout for establishing the hub connection in seconds
    #[serde(default = "default_nats_connect_timeout_secs")]
    pub nats_connect_timeout_secs: u64,

    /// Batch ceiling override in bytes; 0 keeps the server's max payload
    #[serde(default)]
    pub max_batch_bytes: usize,

    // Shutdown
    /// How long in-flight work may run after a shutdown signal
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,

    #[serde(default = "default_closer_timeout_secs")]
    pub closer_timeout_secs: u64,

    // OpenTelemetry
    #[serde(default)]
    pub otel_enabled: bool,

    #[serde(default = "default_otel_endpoint")]
    pub otel_endpoint: String,

    #[serde(default = "default_otel_service_name")]
    pub otel_service_name: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_http_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_config_source() -> String {
    "settings.yaml".to_string()
}

fn default_nats_connect_timeout_secs() -> u64 {
    10
}

fn default_shutdown_timeout_secs() -> u64 {
    30
}

fn default_closer_timeout_secs() -> u64 {
    10
}

fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_otel_service_name() -> String {
    "order-producer".to_string()
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Load from an explicit bootstrap file instead of `./config.*`
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match config_file {
            Some(path) => File::from(path).required(false),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix("PRODUCER"))
            .build()?
            .try_deserialize()
    }

    pub fn telemetry_config(&self) -> TelemetryConfig {
        TelemetryConfig {
            service_name: self.otel_service_name.clone(),
            otel_endpoint: self.otel_endpoint.clone(),
            otel_enabled: self.otel_enabled,
            log_level: self.log_level.clone(),
            log_format: LogFormat::from_name(&self.log_format),
        }
    }

    pub fn control_server_config(&self) -> ControlServerConfig {
        ControlServerConfig {
            host: self.http_host.clone(),
            port: self.http_port,
        }
    }

    pub fn nats_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.nats_connect_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    pub fn closer_timeout(&self) -> Duration {
        Duration::from_secs(self.closer_timeout_secs)
    }

    pub fn max_batch_bytes_override(&self) -> Option<usize> {
        (self.max_batch_bytes > 0).then_some(self.max_batch_bytes)
    }
}
