//! End-user locator adapter

use chrono::{DateTime, Utc};
use contracts::{ChangeEvent, ChangePayload, Row, RowQuery, SyncConfig};
use serde::Serialize;
use sync_engine::SyncEngine;
use tracing::debug;

use crate::consumer::{build_engine, ConsumerAdapter, SyncSource};
use crate::preset::AdapterPreset;

/// What the locator map receives
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationsUpdate {
    /// Fresh snapshot when the engine already has one
    pub locations: Option<Vec<Row>>,
    /// The map must reload its own projection
    pub refetch_required: bool,
    pub observed_at: DateTime<Utc>,
}

impl From<ChangeEvent> for LocationsUpdate {
    fn from(event: ChangeEvent) -> Self {
        let locations = match event.payload {
            ChangePayload::Snapshot(rows) => Some(rows),
            ChangePayload::Row(_) | ChangePayload::None => None,
        };
        Self {
            refetch_required: locations.is_none(),
            locations,
            observed_at: event.timestamp,
        }
    }
}

/// End-user locator consumer
pub struct LocatorSync<Q: RowQuery + Sync + 'static> {
    engine: SyncEngine<Q>,
}

impl<Q: RowQuery + Sync + 'static> LocatorSync<Q> {
    /// Create with the locator preset. Nothing runs until `start()`.
    pub fn new<F>(source: SyncSource<Q>, config: &SyncConfig, on_update: F) -> Self
    where
        F: Fn(LocationsUpdate) + Send + Sync + 'static,
    {
        let engine = build_engine(&AdapterPreset::locator(), source, config, move |event| {
            let update = LocationsUpdate::from(event);
            debug!(
                refetch = update.refetch_required,
                rows = update.locations.as_ref().map_or(0, Vec::len),
                "locator update"
            );
            on_update(update);
        });
        Self { engine }
    }
}

impl<Q: RowQuery + Sync + 'static> ConsumerAdapter for LocatorSync<Q> {
    type Query = Q;

    fn engine(&self) -> &SyncEngine<Q> {
        &self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConnectionBadge;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use transport::MemoryTable;

    #[test]
    fn test_snapshot_needs_no_refetch() {
        let now = Utc::now();
        let update = LocationsUpdate::from(ChangeEvent::poll(now, vec![Row::new(1u64, now)]));
        assert!(!update.refetch_required);
        assert_eq!(update.observed_at, now);

        let manual = LocationsUpdate::from(ChangeEvent::manual(now));
        assert!(manual.refetch_required);
        assert!(manual.locations.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_locator_goes_live_over_push() {
        let table = MemoryTable::new("locations");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let raw = Arc::new(Mutex::new(Vec::new()));
        let raw_sink = Arc::clone(&raw);

        let source = SyncSource::new(table.clone(), "locations")
            .with_columns(vec!["lat".into(), "lng".into()])
            .with_channel(Arc::new(table.channel()))
            .with_tap(move |event| raw_sink.lock().unwrap().push(event.source));
        let locator = LocatorSync::new(source, &SyncConfig::default(), move |u| {
            sink.lock().unwrap().push(u)
        });
        assert_eq!(locator.engine().config().polling_interval, Duration::from_secs(60));

        locator.start();
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
        assert_eq!(locator.badge(), ConnectionBadge::Live);

        table.upsert(Row::new(1u64, Utc::now()).with_column("lat", 52.1));
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].refetch_required);
        assert_eq!(*raw.lock().unwrap(), vec![contracts::EventSource::Push]);
    }
}
