//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use config_loader::{ConfigLoader, ConfigTable, Environment};

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    environments: Vec<String>,
    base_polling_interval_ms: u64,
    base_max_retries: u32,
    push_allowed: bool,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match ConfigLoader::load_from_path(&args.config) {
        Ok(table) => {
            let warnings = collect_warnings(&table);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    environments: table.environment_names().map(str::to_string).collect(),
                    base_polling_interval_ms: table.base.polling_interval.as_millis() as u64,
                    base_max_retries: table.base.max_retries,
                    push_allowed: table.base.push_allowed(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(table: &ConfigTable) -> Vec<String> {
    let mut warnings = Vec::new();

    for name in table.environment_names() {
        if Environment::parse(name).is_none() {
            warnings.push(format!(
                "Environment '{}' is not a known deployment environment",
                name
            ));
        }
    }

    if !table.base.push_allowed() {
        warnings.push("Push transport is disabled - every consumer will poll".to_string());
    }

    if table.base.heartbeat_interval < table.base.polling_interval {
        warnings.push(
            "heartbeat_interval is shorter than polling_interval - slow push confirmations will fall back early"
                .to_string(),
        );
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Environments: {}", summary.environments.join(", "));
            println!("  Base polling interval: {}ms", summary.base_polling_interval_ms);
            println!("  Base max retries: {}", summary.base_max_retries);
            println!("  Push allowed: {}", summary.push_allowed);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_valid_file_with_warning() {
        let file = write_config(
            r#"
[base]
websocket_enabled = false

[environments.staging]
polling_interval_ms = 20000
"#,
        );
        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: true,
        };

        let result = validate_config(&args);
        assert!(result.valid);
        let warnings = result.warnings.unwrap();
        assert!(warnings.iter().any(|w| w.contains("staging")));
        assert!(warnings.iter().any(|w| w.contains("Push transport is disabled")));
        assert!(!result.summary.unwrap().push_allowed);
    }

    #[test]
    fn test_invalid_file() {
        let file = write_config(
            r#"
[environments.production]
polling_interval_ms = 1000
debounce_window_ms = 5000
"#,
        );
        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: false,
        };

        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.is_some());
        assert!(run_validate(&args).is_err());
    }

    #[test]
    fn test_missing_file() {
        let args = ValidateArgs {
            config: "/nonexistent/table-sync.toml".into(),
            json: false,
        };
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("File not found"));
    }
}
