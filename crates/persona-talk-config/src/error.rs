//! Error types for config loading and validation.

use thiserror::Error;

/// Errors returned while loading, validating, or resolving config.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config file could not be read.
    #[error("failed to read config: {0}")]
    ReadFailed(#[from] std::io::Error),
    /// A config file is not valid JSON5.
    #[error("failed to parse config: {0}")]
    ParseFailed(#[from] json5::Error),
    /// The merged document does not match the config model.
    #[error("failed to decode config: {0}")]
    DecodeFailed(#[from] serde_json::Error),
    /// A field failed schema validation.
    #[error("invalid config at {path}: {message}")]
    InvalidField { path: String, message: String },
    /// No API key in config or in any of the checked environment variables.
    #[error("no API key configured (checked gateway.api_key and {})", .checked.join(", "))]
    MissingApiKey { checked: Vec<String> },
    /// Cross-field validation failure.
    #[error("invalid config: {0}")]
    Invalid(String),
}
