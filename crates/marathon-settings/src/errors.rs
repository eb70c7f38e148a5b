//! Settings error types.

use thiserror::Error;

/// Why settings could not be loaded.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file exists but could not be read.
    #[error("cannot read settings file: {0}")]
    Io(#[from] std::io::Error),
    /// The settings file (or the merged result) is not valid settings JSON.
    #[error("malformed settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// Well-formed JSON with an unusable shape or value.
    #[error("invalid settings: {0}")]
    InvalidValue(String),
}

/// Settings result alias.
pub type Result<T> = std::result::Result<T, SettingsError>;
