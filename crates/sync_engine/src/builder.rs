//! Builder for [`SyncEngine`]

use std::sync::Arc;

use contracts::{ChangeEvent, RealtimeChannel, RowQuery, SyncConfig, UpdateCallback};
use transport::{PollTransport, PushTransport};

use crate::engine::SyncEngine;

/// Builder for creating a SyncEngine
///
/// ```ignore
/// let engine = SyncEngineBuilder::new("admin", table.clone(), "locations")
///     .config(config_loader::resolve("production"))
///     .channel(Arc::new(table.channel()))
///     .on_update(|event| println!("{:?}", event.source))
///     .build();
/// engine.start();
/// ```
pub struct SyncEngineBuilder<Q> {
    name: String,
    query: Q,
    table: String,
    columns: Vec<String>,
    config: SyncConfig,
    channel: Option<Arc<dyn RealtimeChannel>>,
    on_update: Option<UpdateCallback>,
}

impl<Q: RowQuery + Sync + 'static> SyncEngineBuilder<Q> {
    /// Create a builder for an engine named `name` polling `table` through `query`
    pub fn new(name: impl Into<String>, query: Q, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            query,
            table: table.into(),
            columns: Vec::new(),
            config: SyncConfig::default(),
            channel: None,
            on_update: None,
        }
    }

    pub fn config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Extra columns fetched on top of `id`, `updated_at`, `name`
    pub fn columns(mut self, columns: Vec<String>) -> Self {
        self.columns = columns;
        self
    }

    /// Realtime channel for the push transport. Without one the engine only polls.
    pub fn channel(mut self, channel: Arc<dyn RealtimeChannel>) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Consumer callback
    pub fn on_update<F>(mut self, callback: F) -> Self
    where
        F: Fn(ChangeEvent) + Send + Sync + 'static,
    {
        self.on_update = Some(Arc::new(callback));
        self
    }

    /// Build the engine. Nothing runs until `start()`.
    pub fn build(self) -> SyncEngine<Q> {
        let poll = PollTransport::new(self.query, self.table, self.columns);
        let push = self.channel.map(PushTransport::new);
        let on_update = self.on_update.unwrap_or_else(|| Arc::new(|_| {}));
        SyncEngine::from_parts(self.name, self.config, poll, push, on_update)
    }
}
