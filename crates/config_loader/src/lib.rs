//! # Config Loader
//!
//! Config provider for the sync engine.
//!
//! Responsibilities:
//! - Resolve a `SyncConfig` per environment (base table + partial override)
//! - Parse TOML/JSON override files
//! - Validate configuration legality
//! - Probe the runtime for edge layers that rule out push
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! let config = config_loader::resolve("development");
//! assert_eq!(config.polling_interval, Duration::from_secs(10));
//! ```

mod capability;
mod parser;
mod table;
mod validator;

pub use capability::{detect_edge_proxy, force_polling_from, parse_flag, RuntimeProbe};
pub use contracts::SyncConfig;
pub use parser::ConfigFormat;
pub use table::{ConfigTable, Environment, EnvironmentOverrides};

use contracts::ContractError;
use std::path::Path;

/// Resolve the built-in table for `environment`.
///
/// Pure and deterministic; unknown environments yield the base table.
pub fn resolve(environment: &str) -> SyncConfig {
    ConfigTable::builtin().resolve(environment)
}

/// Configuration loader
///
/// Provides static methods to load override tables from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load a table from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<ConfigTable, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load a table from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<ConfigTable, ContractError> {
        Self::parse_and_validate(content, format)
    }

    /// Load from `path` when given, otherwise the built-in table
    pub fn load_or_builtin(path: Option<&Path>) -> Result<ConfigTable, ContractError> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Ok(ConfigTable::builtin()),
        }
    }

    /// Serialize a table to TOML string
    pub fn to_toml(table: &ConfigTable) -> Result<String, ContractError> {
        toml::to_string_pretty(table)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize a table to JSON string
    pub fn to_json(table: &ConfigTable) -> Result<String, ContractError> {
        serde_json::to_string_pretty(table)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }

    /// Parse and validate configuration content
    fn parse_and_validate(content: &str, format: ConfigFormat) -> Result<ConfigTable, ContractError> {
        let table = parser::parse(content, format)?;
        validator::validate(&table)?;
        Ok(table)
    }
}
