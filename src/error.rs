use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Talon operations
#[derive(Error, Debug)]
pub enum TalonError {
    /// Bad argument supplied by the caller (unsupported target type,
    /// malformed identifying value). Never retried automatically.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Required credential or configuration key is missing
    #[error("Configuration error: missing required key '{key}'")]
    Configuration { key: String },

    /// Tool is not installed in the local execution environment
    #[error("Tool '{tool}' is not installed")]
    ToolUnavailable { tool: String },

    /// Acquiring the tool's runtime (image pull, download) failed
    #[error("Failed to install tool '{tool}': {reason}")]
    ToolInstallFailure { tool: String, reason: String },

    /// A launch exceeded its timeout; the underlying process was terminated
    #[error("Tool '{tool}' timed out after {seconds}s")]
    ToolTimeout { tool: String, seconds: u64 },

    /// The underlying tool failed (non-zero exit, unusable output)
    #[error("Tool '{tool}' execution failed: {message}")]
    ToolExecution { tool: String, message: String },

    /// An in-flight launch was cancelled by the caller
    #[error("Operation cancelled")]
    Cancelled,

    /// Configuration validation errors
    #[error("Configuration validation failed: {errors:?}")]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// JSON errors
    #[error("JSON error: {context}: {source}")]
    Json {
        source: serde_json::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Path to the configuration key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for Talon operations
pub type Result<T> = std::result::Result<T, TalonError>;
