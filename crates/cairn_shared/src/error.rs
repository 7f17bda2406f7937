//! # Configuration Error Types

use thiserror::Error;

/// Errors raised while loading a [`crate::DecoderConfig`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("could not read config {path}: {reason}")]
    Io {
        /// Path that was tried.
        path: String,
        /// OS error text.
        reason: String,
    },

    /// The TOML did not parse or did not match the schema.
    #[error("invalid config TOML: {0}")]
    Parse(String),

    /// A value parsed but makes no sense.
    #[error("invalid config value `{field}`: {reason}")]
    Invalid {
        /// Dotted field name.
        field: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;
