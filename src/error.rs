//! Error types for thinklog
//!
//! `ThinkLogError` only covers setup: loading and validating configuration,
//! opening the primary log file and installing a tracing subscriber. Failures
//! while a record is being delivered use `SinkError`, `DispatchError`,
//! `EmergencyWriteError` and `BuildError`, and none of them escape the
//! logging entry points.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ThinkLogError {
    /// Rejected configuration value
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Configuration file not found: {0}")]
    ConfigFileMissing(String),

    /// Level string that neither `tracing` nor `EnvFilter` accepts
    #[error("Invalid log level: {0}")]
    InvalidLogLevel(String),

    /// Sink directory or runtime directory that cannot be used
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Log directory creation or file open failed
    #[error("I/O error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },

    /// Malformed TOML or an unknown configuration key
    #[error("TOML parsing error: {source}")]
    TomlError {
        #[from]
        source: toml::de::Error,
    },

    /// A global subscriber is already installed
    #[error("Tracing error: {0}")]
    TracingError(String),
}

pub type Result<T> = std::result::Result<T, ThinkLogError>;

impl ThinkLogError {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn tracing<S: Into<String>>(msg: S) -> Self {
        Self::TracingError(msg.into())
    }
}
