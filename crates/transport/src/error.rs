//! Transport error types

use contracts::ContractError;
use thiserror::Error;

/// Transport-level failures, surfaced to the engine as values
#[derive(Debug, Error)]
pub enum TransportError {
    /// Poll request failed (network or backend)
    #[error("poll of '{table}' failed: {message}")]
    Query { table: String, message: String },

    /// Push subscription could not be established
    #[error("push subscription to '{table}' failed: {message}")]
    Subscribe { table: String, message: String },

    /// Wrapped ContractError
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl TransportError {
    /// Create query error
    pub fn query(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Query {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create subscribe error
    pub fn subscribe(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Subscribe {
            table: table.into(),
            message: message.into(),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, TransportError>;
