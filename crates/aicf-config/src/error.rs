use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid environment override {key}={value}: {reason}")]
    InvalidOverride {
        key: String,
        value: String,
        reason: String,
    },
    #[error("validation failed: {0}")]
    Invalid(String),
}
