//! Layered error definitions
//!
//! Categorized by source: config / query / subscribe

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Store Errors =====
    /// Read against the backing table failed
    #[error("query on '{table}' failed: {message}")]
    Query { table: String, message: String },

    /// Realtime channel refused or dropped a subscription
    #[error("subscribe to '{table}' failed: {message}")]
    Subscribe { table: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

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
