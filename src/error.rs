use std::io;

/// Custom error type for hub_sync startup and configuration
#[derive(Debug, thiserror::Error)]
pub enum HubSyncError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Missing configuration key: {0}")]
    MissingConfigKey(String),

    #[error("Invalid value for configuration key '{key}': {message}")]
    InvalidConfigValue { key: String, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParseError(#[from] serde_json::Error),
}

/// Helper type for Results that use HubSyncError
pub type Result<T> = std::result::Result<T, HubSyncError>;
