//! Config validation
//!
//! Rules:
//! - every interval > 0
//! - max_retries >= 1
//! - debounce_window < polling_interval (base and each override)
//! - environment names non-empty and unique ignoring case

use std::collections::HashSet;
use std::time::Duration;

use contracts::{ContractError, SyncConfig};

use crate::ConfigTable;

/// Validate a config table
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(table: &ConfigTable) -> Result<(), ContractError> {
    validate_base(&table.base)?;
    validate_environment_names(table)?;
    validate_overrides(table)?;
    Ok(())
}

fn validate_base(base: &SyncConfig) -> Result<(), ContractError> {
    let intervals = [
        ("base.retry_delay_ms", base.retry_delay),
        ("base.heartbeat_interval_ms", base.heartbeat_interval),
        ("base.polling_interval_ms", base.polling_interval),
        ("base.debounce_window_ms", base.debounce_window),
    ];
    for (field, value) in intervals {
        if value.is_zero() {
            return Err(ContractError::config_validation(field, "must be > 0"));
        }
    }

    if base.max_retries == 0 {
        return Err(ContractError::config_validation(
            "base.max_retries",
            "max_retries must be >= 1",
        ));
    }

    check_debounce("base", base.debounce_window, base.polling_interval)
}

fn validate_environment_names(table: &ConfigTable) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for name in table.environment_names() {
        let key = name.trim().to_lowercase();
        if key.is_empty() {
            return Err(ContractError::config_validation(
                "environments",
                "environment name cannot be empty",
            ));
        }
        if !seen.insert(key) {
            return Err(ContractError::config_validation(
                format!("environments.{name}"),
                "duplicate environment name",
            ));
        }
    }
    Ok(())
}

/// Overrides are checked in their merged form
fn validate_overrides(table: &ConfigTable) -> Result<(), ContractError> {
    for (name, overrides) in &table.environments {
        if overrides.polling_interval_ms == Some(0) {
            return Err(ContractError::config_validation(
                format!("environments.{name}.polling_interval_ms"),
                "must be > 0",
            ));
        }
        if overrides.debounce_window_ms == Some(0) {
            return Err(ContractError::config_validation(
                format!("environments.{name}.debounce_window_ms"),
                "must be > 0",
            ));
        }

        let merged = table.resolve(name);
        check_debounce(
            &format!("environments.{name}"),
            merged.debounce_window,
            merged.polling_interval,
        )?;
    }
    Ok(())
}

fn check_debounce(scope: &str, debounce: Duration, polling: Duration) -> Result<(), ContractError> {
    if debounce >= polling {
        return Err(ContractError::config_validation(
            format!("{scope}.debounce_window_ms"),
            format!(
                "debounce_window ({}ms) must be < polling_interval ({}ms)",
                debounce.as_millis(),
                polling.as_millis()
            ),
        ));
    }
    Ok(())
}
