//! Simulation runner - drives one consumer against a mutating in-memory table.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use adapters::{AdminSync, ConnectionBadge, ConsumerAdapter, LocatorSync, SyncSource};
use anyhow::Result;
use chrono::Utc;
use contracts::{PushStatus, Row, RowId, SyncConfig};
use observability::SyncMetricsAggregator;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::{interval_at, Instant};
use tracing::{debug, info, warn};
use transport::{MemoryChannel, MemoryTable};

use super::SimulationStats;
use crate::cli::{PresetArg, PushMode};

const TABLE: &str = "locations";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Simulation configuration
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Resolved sync config (preset applied by the adapter)
    pub sync: SyncConfig,

    pub preset: PresetArg,

    /// Rows seeded before the consumer starts
    pub rows: usize,

    /// Spacing between simulated writes
    pub mutation_interval: Duration,

    /// Run duration (None = until shutdown)
    pub duration: Option<Duration>,

    pub push_mode: PushMode,

    /// Break a confirmed push channel after this delay
    pub drop_push_after: Option<Duration>,

    /// Probability in [0, 1] that a write tick fails the next query
    pub failure_rate: f64,

    /// Spacing between manual refreshes (None = never)
    pub refresh_interval: Option<Duration>,

    pub seed: u64,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Simulated consumer run
pub struct Simulation {
    config: SimulationConfig,
}

struct Counters {
    mutations: u64,
    injected_failures: u64,
    refreshes_applied: u64,
    refreshes_rejected: u64,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }

    /// Run until the duration elapses or `shutdown` resolves
    pub async fn run<S>(self, shutdown: S) -> Result<SimulationStats>
    where
        S: Future<Output = ()>,
    {
        let config = &self.config;
        let started = Instant::now();

        if let Some(port) = config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let mut rng = StdRng::seed_from_u64(config.seed);
        let table = MemoryTable::new(TABLE);
        let channel = table.channel();
        channel.set_behavior(config.push_mode.into());
        seed_rows(&table, config.rows, &mut rng);
        let mut next_id = config.rows as u64 + 1;

        info!(
            preset = config.preset.preset().name,
            rows = table.len(),
            push = ?config.push_mode,
            push_allowed = config.sync.push_allowed(),
            "Simulated table ready"
        );

        let deliveries = Arc::new(AtomicU64::new(0));
        let aggregator = Arc::new(Mutex::new(SyncMetricsAggregator::new()));
        let adapter = build_adapter(config, &table, &channel, &deliveries, &aggregator);

        let mut counters = Counters {
            mutations: 0,
            injected_failures: 0,
            refreshes_applied: 0,
            refreshes_rejected: 0,
        };

        let mut status_rx = adapter.engine().subscribe_status();
        let mut mutation_tick = interval_at(
            Instant::now() + config.mutation_interval,
            config.mutation_interval,
        );
        let refresh_period = config.refresh_interval.unwrap_or(Duration::from_secs(3600));
        let mut refresh_tick = interval_at(Instant::now() + refresh_period, refresh_period);

        let deadline = sleep_or_pending(config.duration);
        let push_drop = sleep_or_pending(config.drop_push_after);
        tokio::pin!(shutdown, deadline, push_drop);
        let mut push_dropped = false;

        adapter.start();

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    warn!("Received shutdown signal, stopping simulation...");
                    break;
                }
                _ = &mut deadline => {
                    info!("Simulation duration elapsed");
                    break;
                }
                _ = &mut push_drop, if !push_dropped => {
                    push_dropped = true;
                    warn!("Simulating push channel failure");
                    channel.emit_status(PushStatus::ChannelError);
                }
                Ok(()) = status_rx.changed() => {
                    let status = status_rx.borrow_and_update().clone();
                    info!(
                        badge = %ConnectionBadge::from_status(&status),
                        retry_count = status.retry_count,
                        error = ?status.error,
                        "Connection status changed"
                    );
                }
                _ = mutation_tick.tick() => {
                    mutate(&table, &mut rng, &mut next_id);
                    counters.mutations += 1;
                    if config.failure_rate > 0.0 && rng.random_bool(config.failure_rate) {
                        table.fail_next_queries(1);
                        counters.injected_failures += 1;
                    }
                }
                _ = refresh_tick.tick(), if config.refresh_interval.is_some() => {
                    if adapter.force_refresh().is_applied() {
                        counters.refreshes_applied += 1;
                    } else {
                        counters.refreshes_rejected += 1;
                    }
                }
            }
        }

        let final_status = adapter.status();
        let final_badge = adapter.badge();
        let engine = adapter.engine().stats();
        adapter.stop();

        let sync_metrics = lock(&aggregator).clone();
        Ok(SimulationStats {
            preset: config.preset.preset().name,
            duration: started.elapsed(),
            rows_seeded: config.rows,
            mutations: counters.mutations,
            injected_failures: counters.injected_failures,
            refreshes_applied: counters.refreshes_applied,
            refreshes_rejected: counters.refreshes_rejected,
            deliveries: deliveries.load(Ordering::Relaxed),
            engine,
            final_status,
            final_badge,
            sync_metrics,
        })
    }
}

async fn sleep_or_pending(delay: Option<Duration>) {
    match delay {
        Some(delay) => tokio::time::sleep(delay).await,
        None => std::future::pending().await,
    }
}

fn build_adapter(
    config: &SimulationConfig,
    table: &MemoryTable,
    channel: &MemoryChannel,
    deliveries: &Arc<AtomicU64>,
    aggregator: &Arc<Mutex<SyncMetricsAggregator>>,
) -> Box<dyn ConsumerAdapter<Query = MemoryTable>> {
    let tap = Arc::clone(aggregator);
    let source = SyncSource::new(table.clone(), TABLE)
        .with_columns(vec!["lat".into(), "lng".into(), "open".into()])
        .with_channel(Arc::new(channel.clone()))
        .with_tap(move |event| lock(&tap).update(&event));

    let delivered = Arc::clone(deliveries);
    match config.preset {
        PresetArg::Admin => Box::new(AdminSync::new(source, &config.sync, move |refresh| {
            delivered.fetch_add(1, Ordering::Relaxed);
            info!(
                reason = ?refresh.reason,
                records = refresh.records.as_ref().map_or(0, Vec::len),
                changed = ?refresh.changed.as_ref().map(|c| c.row.id.clone()),
                "Admin refresh"
            );
        })),
        PresetArg::Locator => Box::new(LocatorSync::new(source, &config.sync, move |update| {
            delivered.fetch_add(1, Ordering::Relaxed);
            info!(
                locations = update.locations.as_ref().map_or(0, Vec::len),
                refetch = update.refetch_required,
                "Locator update"
            );
        })),
    }
}

fn seed_rows(table: &MemoryTable, rows: usize, rng: &mut StdRng) {
    let now = Utc::now();
    for i in 1..=rows as u64 {
        let age = chrono::Duration::minutes(rng.random_range(0..10_000));
        table.upsert(random_row(i, now - age, rng));
    }
}

fn random_row(id: u64, updated_at: chrono::DateTime<Utc>, rng: &mut StdRng) -> Row {
    Row::new(id, updated_at)
        .with_name(format!("Location {id}"))
        .with_column("lat", rng.random_range(-60.0..60.0))
        .with_column("lng", rng.random_range(-180.0..180.0))
        .with_column("open", rng.random_bool(0.8))
}

/// Apply one random write: mostly updates, some inserts, few deletes
fn mutate(table: &MemoryTable, rng: &mut StdRng, next_id: &mut u64) {
    let ids = table.ids();
    let roll: f64 = rng.random();

    if ids.is_empty() || roll < 0.2 {
        let id = *next_id;
        *next_id += 1;
        table.upsert(random_row(id, Utc::now(), rng));
        debug!(id, "Simulated insert");
    } else if roll < 0.3 && ids.len() > 1 {
        let id: &RowId = &ids[rng.random_range(0..ids.len())];
        table.delete(id);
        debug!(id = %id, "Simulated delete");
    } else {
        let id = &ids[rng.random_range(0..ids.len())];
        if let Some(row) = table.get(id) {
            let lat = row.columns.get("lat").and_then(|v| v.as_f64()).unwrap_or(0.0);
            let moved = Row {
                updated_at: Utc::now(),
                ..row
            }
            .with_column("lat", lat + rng.random_range(-0.01..0.01));
            table.upsert(moved);
            debug!(id = %id, "Simulated update");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(preset: PresetArg) -> SimulationConfig {
        SimulationConfig {
            sync: config_loader::resolve("test"),
            preset,
            rows: 5,
            mutation_interval: Duration::from_secs(1),
            duration: Some(Duration::from_millis(40_500)),
            push_mode: PushMode::Confirm,
            drop_push_after: None,
            failure_rate: 0.0,
            refresh_interval: None,
            seed: 7,
            metrics_port: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_push_drop_falls_back_to_polling() {
        let mut config = config(PresetArg::Admin);
        config.drop_push_after = Some(Duration::from_secs(3));

        let stats = Simulation::new(config)
            .run(std::future::pending())
            .await
            .unwrap();

        assert_eq!(stats.engine.push_fallbacks, 1);
        assert!(stats.engine.polls_ok >= 2);
        assert!(stats.deliveries > 0);
        assert_eq!(stats.final_badge, ConnectionBadge::Polling);
        assert_eq!(stats.mutations, 40);
        assert_eq!(stats.sync_metrics.total_events, stats.engine.events_emitted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_forced_polling_with_failures() {
        let mut config = config(PresetArg::Locator);
        config.sync = config.sync.with_force_polling(true);
        config.failure_rate = 1.0;
        config.duration = Some(Duration::from_secs(10));

        let stats = Simulation::new(config)
            .run(std::future::pending())
            .await
            .unwrap();

        assert_eq!(stats.injected_failures, stats.mutations);
        assert_eq!(stats.engine.push_fallbacks, 0);
        assert_eq!(stats.engine.polls_ok, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_signal_stops_run() {
        let mut config = config(PresetArg::Locator);
        config.duration = None;
        config.refresh_interval = Some(Duration::from_millis(50));

        let stats = Simulation::new(config)
            .run(tokio::time::sleep(Duration::from_millis(1_500)))
            .await
            .unwrap();

        assert_eq!(stats.mutations, 1);
        assert!(stats.refreshes_applied >= 1);
        assert!(stats.refreshes_rejected >= 1);
        assert_eq!(stats.final_badge, ConnectionBadge::Live);
    }
}
