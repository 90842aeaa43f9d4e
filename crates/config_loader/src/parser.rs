//! Config file parsing
//!
//! TOML is the primary format; JSON is accepted for generated files.

use contracts::ContractError;

use crate::ConfigTable;

/// Config file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML (recommended)
    Toml,
    /// JSON
    Json,
}

impl ConfigFormat {
    /// Infer the format from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Parse a TOML config table
pub fn parse_toml(content: &str) -> Result<ConfigTable, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse a JSON config table
pub fn parse_json(content: &str) -> Result<ConfigTable, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse according to `format`
pub fn parse(content: &str, format: ConfigFormat) -> Result<ConfigTable, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_parse_toml_partial_base() {
        let content = r#"
[base]
polling_interval_ms = 20000
max_retries = 4

[environments.production]
debounce_window_ms = 3000
"#;
        let table = parse_toml(content).unwrap();
        assert_eq!(table.base.polling_interval, Duration::from_secs(20));
        assert_eq!(table.base.max_retries, 4);
        // Missing base keys take the built-in defaults
        assert_eq!(table.base.heartbeat_interval, Duration::from_secs(30));
        assert_eq!(
            table.environments["production"].debounce_window_ms,
            Some(3000)
        );
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "base": { "polling_interval_ms": 15000 },
            "environments": { "development": { "polling_interval_ms": 5000 } }
        }"#;
        let table = parse_json(content).unwrap();
        assert_eq!(table.base.polling_interval, Duration::from_secs(15));
        assert_eq!(table.environments.len(), 1);
    }

    #[test]
    fn test_override_of_non_overridable_key_is_rejected() {
        let content = r#"
[environments.production]
max_retries = 10
"#;
        let err = parse_toml(content).unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
        assert!(err.to_string().contains("max_retries"), "got: {err}");
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let result = parse_toml("invalid toml [[[");
        assert!(matches!(result, Err(ContractError::ConfigParse { .. })));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_extension("toml"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("TOML"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("json"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
