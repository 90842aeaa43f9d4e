//! Sync engine configuration contracts that can be shared across crates.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Resolved synchronization knobs for one environment.
///
/// Produced once by the config provider and never mutated afterwards;
/// every engine instance receives its own copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Base delay used by the poll failure backoff
    #[serde(rename = "retry_delay_ms", with = "duration_ms")]
    pub retry_delay: Duration,

    /// Consecutive poll failures before the engine reports `Failed`
    pub max_retries: u32,

    /// How long a push subscription may stay unconfirmed
    #[serde(rename = "heartbeat_interval_ms", with = "duration_ms")]
    pub heartbeat_interval: Duration,

    /// Spacing between two poll cycles
    #[serde(rename = "polling_interval_ms", with = "duration_ms")]
    pub polling_interval: Duration,

    /// Minimum spacing between two applied manual refreshes
    #[serde(rename = "debounce_window_ms", with = "duration_ms")]
    pub debounce_window: Duration,

    /// Push transport switch
    pub websocket_enabled: bool,

    /// Disables push entirely (explicit flag or detected edge layer)
    pub force_polling_mode: bool,
}

impl SyncConfig {
    /// Whether the engine may try the push transport at all.
    pub fn push_allowed(&self) -> bool {
        self.websocket_enabled && !self.force_polling_mode
    }

    /// Returns a copy with `force_polling_mode` set.
    pub fn with_force_polling(mut self, force: bool) -> Self {
        self.force_polling_mode = force;
        self
    }

    /// Returns a copy with a different polling cadence.
    pub fn with_polling_interval(mut self, interval: Duration) -> Self {
        self.polling_interval = interval;
        self
    }

    /// Returns a copy with a different failure threshold.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Delay before the next poll after `failures` consecutive failures.
    ///
    /// Exponential on `retry_delay`, never shorter than the regular interval
    /// and never longer than four intervals.
    pub fn failure_backoff(&self, failures: u32) -> Duration {
        if failures == 0 {
            return self.polling_interval;
        }
        let exp = failures.saturating_sub(1).min(16);
        let backoff = self.retry_delay.saturating_mul(1u32 << exp);
        backoff
            .max(self.polling_interval)
            .min(self.polling_interval.saturating_mul(4))
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_secs(5),
            max_retries: 3,
            heartbeat_interval: Duration::from_secs(30),
            polling_interval: Duration::from_secs(30),
            debounce_window: Duration::from_secs(1),
            websocket_enabled: true,
            force_polling_mode: false,
        }
    }
}

/// Serde helper storing a `Duration` as integer milliseconds.
pub mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_allowed() {
        let config = SyncConfig::default();
        assert!(config.push_allowed());
        assert!(!config.clone().with_force_polling(true).push_allowed());

        let disabled = SyncConfig {
            websocket_enabled: false,
            ..SyncConfig::default()
        };
        assert!(!disabled.push_allowed());
    }

    #[test]
    fn test_failure_backoff_bounds() {
        let config = SyncConfig {
            retry_delay: Duration::from_secs(5),
            polling_interval: Duration::from_secs(10),
            ..SyncConfig::default()
        };

        assert_eq!(config.failure_backoff(0), Duration::from_secs(10));
        assert_eq!(config.failure_backoff(1), Duration::from_secs(10));
        assert_eq!(config.failure_backoff(2), Duration::from_secs(10));
        assert_eq!(config.failure_backoff(3), Duration::from_secs(20));
        assert_eq!(config.failure_backoff(4), Duration::from_secs(40));
        assert_eq!(config.failure_backoff(30), Duration::from_secs(40));
    }

    #[test]
    fn test_serde_uses_milliseconds() {
        let json = serde_json::to_value(SyncConfig::default()).unwrap();
        assert_eq!(json["polling_interval_ms"], 30_000);
        assert_eq!(json["debounce_window_ms"], 1_000);

        let parsed: SyncConfig = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, SyncConfig::default());
    }
}
