//! Sync engine metrics
//!
//! Prometheus helpers called by the engine, plus an in-memory aggregator that
//! summarises what a consumer received during a run.

use std::collections::HashMap;

use contracts::{ChangeEvent, ChangePayload};
use metrics::{counter, gauge, histogram};

/// Record one poll cycle
pub fn record_poll(engine: &str, success: bool, latency_ms: f64) {
    let outcome = if success { "success" } else { "failure" };
    counter!(
        "table_sync_polls_total",
        "engine" => engine.to_string(),
        "outcome" => outcome
    )
    .increment(1);

    histogram!("table_sync_poll_latency_ms", "engine" => engine.to_string()).record(latency_ms);
}

/// Record a notification handed to the consumer
pub fn record_change_event(engine: &str, source: &str) {
    counter!(
        "table_sync_change_events_total",
        "engine" => engine.to_string(),
        "source" => source.to_string()
    )
    .increment(1);
}

/// Record a push-to-poll fallback
pub fn record_push_fallback(engine: &str, reason: &str) {
    counter!(
        "table_sync_push_fallbacks_total",
        "engine" => engine.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// Record a manual refresh rejected by the debounce gate
pub fn record_refresh_rejected(engine: &str) {
    counter!("table_sync_refresh_rejected_total", "engine" => engine.to_string()).increment(1);
}

/// Record the current connection state
pub fn record_connection(engine: &str, connected: bool, connection_type: &str) {
    gauge!("table_sync_connected", "engine" => engine.to_string())
        .set(if connected { 1.0 } else { 0.0 });
    counter!(
        "table_sync_connection_transitions_total",
        "engine" => engine.to_string(),
        "connection_type" => connection_type.to_string()
    )
    .increment(1);
}

/// Consumer-side aggregator
///
/// Fed with every `ChangeEvent` a consumer receives.
#[derive(Debug, Clone, Default)]
pub struct SyncMetricsAggregator {
    pub total_events: u64,

    /// Events per source (`push` / `poll` / `manual`)
    pub events_by_source: HashMap<String, u64>,

    /// Rows per poll snapshot
    pub snapshot_rows: RunningStats,

    /// Event timestamp minus newest `updated_at` it carried (ms)
    pub staleness_ms: RunningStats,
}

impl SyncMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event into the statistics
    pub fn update(&mut self, event: &ChangeEvent) {
        self.total_events += 1;
        *self
            .events_by_source
            .entry(event.source.as_str().to_string())
            .or_insert(0) += 1;

        let newest = match &event.payload {
            ChangePayload::Snapshot(rows) => {
                self.snapshot_rows.push(rows.len() as f64);
                rows.iter().map(|r| r.updated_at).max()
            }
            ChangePayload::Row(change) => Some(change.row.updated_at),
            ChangePayload::None => None,
        };

        if let Some(newest) = newest {
            let lag = (event.timestamp - newest).num_milliseconds().max(0);
            self.staleness_ms.push(lag as f64);
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_events: self.total_events,
            events_by_source: self.events_by_source.clone(),
            snapshot_rows: StatsSummary::from(&self.snapshot_rows),
            staleness_ms: StatsSummary::from(&self.staleness_ms),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Aggregated run summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_events: u64,
    pub events_by_source: HashMap<String, u64>,
    pub snapshot_rows: StatsSummary,
    pub staleness_ms: StatsSummary,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Sync Metrics Summary ===")?;
        writeln!(f, "Total events: {}", self.total_events)?;

        let mut sources: Vec<_> = self.events_by_source.iter().collect();
        sources.sort();
        for (source, count) in sources {
            writeln!(f, "  {}: {}", source, count)?;
        }

        writeln!(f, "Rows per snapshot: {}", self.snapshot_rows)?;
        writeln!(f, "Staleness (ms): {}", self.staleness_ms)?;
        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.1}, max={:.1}, mean={:.1}, std={:.1} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }

        self.min = self.min.min(value);
        self.max = self.max.max(value);

        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
