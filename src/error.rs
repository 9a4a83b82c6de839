// src/error.rs

//! Unified error handling for the publishing service.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type alias for service operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Project configuration file does not exist
    #[error("Missing config: {}. Set PROJECT_CONFIG_PATH or create project_config.json.", path.display())]
    ConfigMissing { path: PathBuf },

    /// Project configuration is unparsable or structurally wrong
    #[error("Invalid config: {0}")]
    ConfigInvalid(String),

    /// Upstream credentials are missing or unusable
    #[error("Credential error: {0}")]
    Credential(String),

    /// Upstream spreadsheet API failed
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Live data has never been produced and could not be generated
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    /// Historical query date is not `YYYY-MM-DD`
    #[error("Invalid date format '{0}'. Use YYYY-MM-DD")]
    InvalidDateFormat(String),

    /// Requested snapshot does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Tile proxy cannot serve the request
    #[error("{0}")]
    Proxy(String),

    /// Runtime settings error
    #[error("Settings error: {0}")]
    Settings(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
}

impl AppError {
    /// Create a missing-config error.
    pub fn config_missing(path: impl AsRef<Path>) -> Self {
        Self::ConfigMissing {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Create an invalid-config error.
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::ConfigInvalid(message.into())
    }

    /// Create a credential error.
    pub fn credential(message: impl Into<String>) -> Self {
        Self::Credential(message.into())
    }

    /// Create an upstream error.
    pub fn upstream(message: impl fmt::Display) -> Self {
        Self::Upstream(message.to_string())
    }

    /// Create a settings error.
    pub fn settings(message: impl Into<String>) -> Self {
        Self::Settings(message.into())
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// True for `ConfigMissing` and `ConfigInvalid`.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::ConfigMissing { .. } | Self::ConfigInvalid(_))
    }
}
