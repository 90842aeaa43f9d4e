//! Wall clock derived from Tokio's monotonic clock
//!
//! Observable timestamps are `Utc` but advance with `tokio::time`, so they
//! stay ordered and follow paused time in tests.

use chrono::{DateTime, TimeDelta, Utc};
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
pub(crate) struct WallClock {
    anchor_utc: DateTime<Utc>,
    anchor: Instant,
}

impl WallClock {
    pub(crate) fn new() -> Self {
        Self {
            anchor_utc: Utc::now(),
            anchor: Instant::now(),
        }
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        let elapsed = TimeDelta::from_std(self.anchor.elapsed()).unwrap_or(TimeDelta::MAX);
        self.anchor_utc
            .checked_add_signed(elapsed)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_follows_tokio_time() {
        let clock = WallClock::new();
        let t0 = clock.now();

        tokio::time::sleep(Duration::from_secs(3)).await;
        let t1 = clock.now();

        assert_eq!((t1 - t0).num_seconds(), 3);
    }
}
