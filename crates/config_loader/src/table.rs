//! Config table - base defaults plus per-environment overrides

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use contracts::SyncConfig;
use serde::{Deserialize, Serialize};

/// Known deployment environments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    /// Parse an environment name (case-insensitive, `dev`/`prod` aliases)
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "production" | "prod" => Some(Self::Production),
            "test" => Some(Self::Test),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partial override for one environment.
///
/// Only the polling and debounce groups may be overridden; any other key is
/// rejected at parse time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polling_interval_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debounce_window_ms: Option<u64>,
}

impl EnvironmentOverrides {
    fn apply(&self, base: &SyncConfig) -> SyncConfig {
        let mut config = base.clone();
        if let Some(ms) = self.polling_interval_ms {
            config.polling_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = self.debounce_window_ms {
            config.debounce_window = Duration::from_millis(ms);
        }
        config
    }
}

/// Base table merged with environment overrides
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigTable {
    #[serde(default)]
    pub base: SyncConfig,

    #[serde(default)]
    pub environments: BTreeMap<String, EnvironmentOverrides>,
}

impl ConfigTable {
    /// Table compiled into the binary
    pub fn builtin() -> Self {
        let environments = BTreeMap::from([
            (
                Environment::Development.as_str().to_string(),
                EnvironmentOverrides {
                    polling_interval_ms: Some(10_000),
                    debounce_window_ms: Some(500),
                },
            ),
            (
                Environment::Production.as_str().to_string(),
                EnvironmentOverrides {
                    polling_interval_ms: Some(30_000),
                    debounce_window_ms: Some(2_000),
                },
            ),
            (
                Environment::Test.as_str().to_string(),
                EnvironmentOverrides {
                    polling_interval_ms: Some(1_000),
                    debounce_window_ms: Some(100),
                },
            ),
        ]);

        Self {
            base: SyncConfig::default(),
            environments,
        }
    }

    /// Resolve the configuration for `environment`.
    ///
    /// Pure: the same table and name always yield the same value. Unknown
    /// environments fall back to the base table unchanged.
    pub fn resolve(&self, environment: &str) -> SyncConfig {
        match self.overrides_for(&normalize(environment)) {
            Some(overrides) => overrides.apply(&self.base),
            None => self.base.clone(),
        }
    }

    /// Whether `environment` has overrides in this table
    pub fn has_environment(&self, environment: &str) -> bool {
        self.overrides_for(&normalize(environment)).is_some()
    }

    /// Names of the environments with overrides
    pub fn environment_names(&self) -> impl Iterator<Item = &str> {
        self.environments.keys().map(String::as_str)
    }

    fn overrides_for(&self, key: &str) -> Option<&EnvironmentOverrides> {
        self.environments
            .iter()
            .find(|(name, _)| normalize(name) == key)
            .map(|(_, overrides)| overrides)
    }
}

impl Default for ConfigTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Canonical lookup key: known environments map to their canonical name
fn normalize(name: &str) -> String {
    match Environment::parse(name) {
        Some(env) => env.as_str().to_string(),
        None => name.trim().to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_parse_aliases() {
        assert_eq!(Environment::parse("dev"), Some(Environment::Development));
        assert_eq!(Environment::parse("PRODUCTION"), Some(Environment::Production));
        assert_eq!(Environment::parse(" test "), Some(Environment::Test));
        assert_eq!(Environment::parse("staging"), None);
    }

    #[test]
    fn test_builtin_development_overrides() {
        let config = ConfigTable::builtin().resolve("development");
        assert_eq!(config.polling_interval, Duration::from_secs(10));
        assert_eq!(config.debounce_window, Duration::from_millis(500));
        // Non-overridable groups come from the base table
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_delay, Duration::from_secs(5));
    }

    #[test]
    fn test_unknown_environment_falls_back_to_base() {
        let table = ConfigTable::builtin();
        assert_eq!(table.resolve("staging"), table.base);
        assert!(!table.has_environment("staging"));
        assert!(table.has_environment("PROD"));
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let table = ConfigTable::builtin();
        assert_eq!(table.resolve("production"), table.resolve("production"));
        assert_eq!(table.resolve("prod"), table.resolve("Production"));
    }

    #[test]
    fn test_custom_environment_names_are_case_insensitive() {
        let mut table = ConfigTable::builtin();
        table.environments.insert(
            "Staging".to_string(),
            EnvironmentOverrides {
                polling_interval_ms: Some(5_000),
                debounce_window_ms: None,
            },
        );

        let config = table.resolve("staging");
        assert_eq!(config.polling_interval, Duration::from_secs(5));
        assert_eq!(config.debounce_window, table.base.debounce_window);
    }
}
