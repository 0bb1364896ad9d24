use thiserror::Error;

/// Errors raised while reading or interpreting runtime settings
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration has not been loaded")]
    NotLoaded,

    #[error("setting {0} not found")]
    MissingSetting(String),

    #[error("setting {0} is empty")]
    EmptySetting(String),

    #[error("invalid duration {value:?}: {reason}")]
    InvalidDuration { value: String, reason: String },

    #[error("failed to read settings source {path}")]
    Source {
        path: String,
        #[source]
        source: config::ConfigError,
    },
}
