//! Simulation statistics.

use std::time::Duration;

use adapters::ConnectionBadge;
use contracts::ConnectionStatus;
use observability::SyncMetricsAggregator;
use sync_engine::StatsSnapshot;

/// Statistics from a simulation run
#[derive(Debug, Clone)]
pub struct SimulationStats {
    pub preset: &'static str,

    /// Wall time of the run
    pub duration: Duration,

    pub rows_seeded: usize,

    /// Writes applied to the simulated table
    pub mutations: u64,

    /// Queries forced to fail
    pub injected_failures: u64,

    pub refreshes_applied: u64,
    pub refreshes_rejected: u64,

    /// Updates handed to the consumer surface
    pub deliveries: u64,

    pub engine: StatsSnapshot,
    pub final_status: ConnectionStatus,
    pub final_badge: ConnectionBadge,

    /// Raw change events seen through the adapter tap
    pub sync_metrics: SyncMetricsAggregator,
}

impl SimulationStats {
    /// Consumer deliveries per second
    pub fn delivery_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.deliveries as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Simulation Statistics ({}) ===\n", self.preset);

        println!("Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Rows seeded: {}", self.rows_seeded);
        println!("   ├─ Mutations: {}", self.mutations);
        println!("   ├─ Injected query failures: {}", self.injected_failures);
        println!(
            "   ├─ Manual refreshes: {} applied, {} rejected",
            self.refreshes_applied, self.refreshes_rejected
        );
        println!(
            "   └─ Deliveries: {} ({:.2}/s)",
            self.deliveries,
            self.delivery_rate()
        );

        println!("\nEngine");
        println!(
            "   ├─ Polls: {} ok, {} failed",
            self.engine.polls_ok, self.engine.polls_failed
        );
        println!("   ├─ Push fallbacks: {}", self.engine.push_fallbacks);
        println!("   ├─ Events emitted: {}", self.engine.events_emitted);
        println!("   ├─ Final badge: {}", self.final_badge);
        println!("   ├─ Retry count: {}", self.final_status.retry_count);
        match &self.final_status.error {
            Some(error) => println!("   └─ Last error: {}", error),
            None => println!("   └─ Last error: none"),
        }

        println!("\n{}", self.sync_metrics.summary());
    }
}
