//! Admin console adapter

use contracts::{ChangeEvent, ChangePayload, EventType, Row, RowChange, RowQuery, SyncConfig};
use serde::Serialize;
use sync_engine::SyncEngine;
use tracing::debug;

use crate::consumer::{build_engine, ConsumerAdapter, SyncSource};
use crate::preset::AdapterPreset;

/// Why the admin tables should reload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshReason {
    Realtime,
    Scheduled,
    Manual,
}

/// What the admin console receives
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminRefresh {
    pub reason: RefreshReason,
    /// Full snapshot, for scheduled refreshes
    pub records: Option<Vec<Row>>,
    /// Single row, for realtime refreshes
    pub changed: Option<RowChange>,
}

impl From<ChangeEvent> for AdminRefresh {
    fn from(event: ChangeEvent) -> Self {
        let reason = match event.event_type {
            EventType::PushUpdate => RefreshReason::Realtime,
            EventType::PollUpdate => RefreshReason::Scheduled,
            EventType::ManualRefresh => RefreshReason::Manual,
        };
        let (records, changed) = match event.payload {
            ChangePayload::Snapshot(rows) => (Some(rows), None),
            ChangePayload::Row(change) => (None, Some(change)),
            ChangePayload::None => (None, None),
        };
        Self {
            reason,
            records,
            changed,
        }
    }
}

/// Admin console consumer
pub struct AdminSync<Q: RowQuery + Sync + 'static> {
    engine: SyncEngine<Q>,
}

impl<Q: RowQuery + Sync + 'static> AdminSync<Q> {
    /// Create with the admin preset. Nothing runs until `start()`.
    pub fn new<F>(source: SyncSource<Q>, config: &SyncConfig, on_refresh: F) -> Self
    where
        F: Fn(AdminRefresh) + Send + Sync + 'static,
    {
        let engine = build_engine(&AdapterPreset::admin(), source, config, move |event| {
            let refresh = AdminRefresh::from(event);
            debug!(reason = ?refresh.reason, "admin refresh");
            on_refresh(refresh);
        });
        Self { engine }
    }
}

impl<Q: RowQuery + Sync + 'static> ConsumerAdapter for AdminSync<Q> {
    type Query = Q;

    fn engine(&self) -> &SyncEngine<Q> {
        &self.engine
    }
}
