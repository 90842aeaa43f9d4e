//! Named presets

use std::time::Duration;

use serde::Serialize;

use contracts::SyncConfig;

/// Interval/retry defaults for one kind of consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AdapterPreset {
    pub name: &'static str,
    pub polling_interval: Duration,
    pub max_retries: u32,
}

impl AdapterPreset {
    /// Admin console: fresh data matters, tolerate more failures
    pub const fn admin() -> Self {
        Self {
            name: "admin",
            polling_interval: Duration::from_secs(15),
            max_retries: 5,
        }
    }

    /// End-user locator: locations rarely change
    pub const fn locator() -> Self {
        Self {
            name: "locator",
            polling_interval: Duration::from_secs(60),
            max_retries: 3,
        }
    }

    pub fn all() -> [Self; 2] {
        [Self::admin(), Self::locator()]
    }

    /// Look a preset up by name (case-insensitive)
    pub fn by_name(name: &str) -> Option<Self> {
        Self::all()
            .into_iter()
            .find(|preset| preset.name.eq_ignore_ascii_case(name.trim()))
    }

    /// Copy of `config` with this preset's cadence and retry budget.
    ///
    /// Every other knob is left as resolved.
    pub fn apply(&self, config: &SyncConfig) -> SyncConfig {
        config
            .clone()
            .with_polling_interval(self.polling_interval)
            .with_max_retries(self.max_retries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_overrides_only_preset_knobs() {
        let base = SyncConfig {
            debounce_window: Duration::from_secs(2),
            force_polling_mode: true,
            ..SyncConfig::default()
        };

        let admin = AdapterPreset::admin().apply(&base);
        assert_eq!(admin.polling_interval, Duration::from_secs(15));
        assert_eq!(admin.max_retries, 5);
        assert_eq!(admin.debounce_window, Duration::from_secs(2));
        assert!(admin.force_polling_mode);
        assert_eq!(admin.retry_delay, base.retry_delay);
    }

    #[test]
    fn test_by_name() {
        assert_eq!(AdapterPreset::by_name("Locator"), Some(AdapterPreset::locator()));
        assert_eq!(AdapterPreset::by_name(" admin "), Some(AdapterPreset::admin()));
        assert_eq!(AdapterPreset::by_name("kiosk"), None);
    }
}
