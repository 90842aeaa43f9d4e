//! Shared adapter plumbing

use std::sync::Arc;

use contracts::{
    ChangeEvent, ConnectionStatus, RealtimeChannel, RowQuery, SyncConfig, UpdateCallback,
};
use sync_engine::{RefreshOutcome, SyncEngine, SyncEngineBuilder};

use crate::badge::ConnectionBadge;
use crate::preset::AdapterPreset;

/// Where an adapter reads from
pub struct SyncSource<Q> {
    pub query: Q,
    pub table: String,
    pub columns: Vec<String>,
    pub channel: Option<Arc<dyn RealtimeChannel>>,
    /// Sees every raw event before translation
    pub tap: Option<UpdateCallback>,
}

impl<Q> SyncSource<Q> {
    pub fn new(query: Q, table: impl Into<String>) -> Self {
        Self {
            query,
            table: table.into(),
            columns: Vec::new(),
            channel: None,
            tap: None,
        }
    }

    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_channel(mut self, channel: Arc<dyn RealtimeChannel>) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn with_tap<F>(mut self, tap: F) -> Self
    where
        F: Fn(ChangeEvent) + Send + Sync + 'static,
    {
        self.tap = Some(Arc::new(tap));
        self
    }
}

pub(crate) fn build_engine<Q, F>(
    preset: &AdapterPreset,
    source: SyncSource<Q>,
    config: &SyncConfig,
    on_update: F,
) -> SyncEngine<Q>
where
    Q: RowQuery + Sync + 'static,
    F: Fn(ChangeEvent) + Send + Sync + 'static,
{
    let tap = source.tap;
    let mut builder = SyncEngineBuilder::new(preset.name, source.query, source.table)
        .config(preset.apply(config))
        .columns(source.columns)
        .on_update(move |event| {
            if let Some(tap) = &tap {
                tap(event.clone());
            }
            on_update(event);
        });
    if let Some(channel) = source.channel {
        builder = builder.channel(channel);
    }
    builder.build()
}

/// Lifecycle surface shared by every adapter
///
/// Everything forwards to the wrapped engine; adapters only translate events.
pub trait ConsumerAdapter {
    type Query: RowQuery + Sync + 'static;

    fn engine(&self) -> &SyncEngine<Self::Query>;

    fn start(&self) {
        self.engine().start();
    }

    fn stop(&self) {
        self.engine().stop();
    }

    fn force_refresh(&self) -> RefreshOutcome {
        self.engine().force_refresh()
    }

    fn retry(&self) {
        self.engine().retry();
    }

    fn status(&self) -> ConnectionStatus {
        self.engine().status()
    }

    fn badge(&self) -> ConnectionBadge {
        ConnectionBadge::from_status(&self.status())
    }
}
