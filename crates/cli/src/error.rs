//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// A flag value the simulation cannot use
    #[error("Invalid value for --{flag}: {message}")]
    InvalidArgument { flag: String, message: String },

    /// Config layer error
    #[error(transparent)]
    Config(#[from] contracts::ContractError),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn invalid_argument(flag: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            flag: flag.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
