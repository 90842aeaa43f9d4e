//! In-memory backing table
//!
//! Implements both store seams so the engine can run without a hosted
//! backend. Supports injecting query failures, query latency and channel
//! misbehaviour.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use contracts::{
    ChangeKind, ContractError, ListenerId, ProjectionQuery, PushStatus, PushStatusCallback,
    RealtimeChannel, Row, RowChange, RowChangeCallback, RowId, RowQuery,
};
use tracing::{debug, trace};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared in-memory table
///
/// Cheap to clone; clones share rows, channel and failure injection.
#[derive(Clone)]
pub struct MemoryTable {
    inner: Arc<TableInner>,
}

struct TableInner {
    name: String,
    rows: Mutex<BTreeMap<RowId, Row>>,
    pending_failures: AtomicU32,
    latency: Mutex<Option<Duration>>,
    queries: AtomicU64,
    channel: MemoryChannel,
}

impl MemoryTable {
    /// Create an empty table
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(TableInner {
                name: name.into(),
                rows: Mutex::new(BTreeMap::new()),
                pending_failures: AtomicU32::new(0),
                latency: Mutex::new(None),
                queries: AtomicU64::new(0),
                channel: MemoryChannel::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Realtime channel fed by this table's mutations
    pub fn channel(&self) -> MemoryChannel {
        self.inner.channel.clone()
    }

    /// Insert or replace a row and publish the change
    pub fn upsert(&self, row: Row) {
        let previous = lock(&self.inner.rows).insert(row.id.clone(), row.clone());
        let kind = if previous.is_some() {
            ChangeKind::Update
        } else {
            ChangeKind::Insert
        };
        trace!(table = %self.inner.name, id = %row.id, ?kind, "row written");
        self.inner.channel.publish(RowChange {
            kind,
            table: self.inner.name.clone(),
            row,
        });
    }

    /// Remove a row and publish the change. Returns whether it existed.
    pub fn delete(&self, id: &str) -> bool {
        let removed = lock(&self.inner.rows).remove(id);
        match removed {
            Some(row) => {
                self.inner.channel.publish(RowChange {
                    kind: ChangeKind::Delete,
                    table: self.inner.name.clone(),
                    row,
                });
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &str) -> Option<Row> {
        lock(&self.inner.rows).get(id).cloned()
    }

    pub fn ids(&self) -> Vec<RowId> {
        lock(&self.inner.rows).keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.inner.rows).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make the next `n` queries fail
    pub fn fail_next_queries(&self, n: u32) {
        self.inner.pending_failures.store(n, Ordering::SeqCst);
    }

    /// Delay every query by `latency`
    pub fn set_latency(&self, latency: Option<Duration>) {
        *lock(&self.inner.latency) = latency;
    }

    /// Number of queries served (including failed ones)
    pub fn query_count(&self) -> u64 {
        self.inner.queries.load(Ordering::SeqCst)
    }

    fn take_failure(&self) -> bool {
        self.inner
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn select(&self, query: &ProjectionQuery) -> Vec<Row> {
        let mut rows: Vec<Row> = lock(&self.inner.rows)
            .values()
            .map(|row| row.project(&query.columns))
            .collect();

        rows.sort_by(|a, b| {
            let ord = match query.order_by.column.as_str() {
                "name" => a.name.cmp(&b.name),
                "id" => a.id.cmp(&b.id),
                _ => a.updated_at.cmp(&b.updated_at),
            }
            .then_with(|| a.id.cmp(&b.id));
            if query.order_by.descending {
                ord.reverse()
            } else {
                ord
            }
        });
        rows
    }
}

impl RowQuery for MemoryTable {
    async fn fetch(&self, query: &ProjectionQuery) -> Result<Vec<Row>, ContractError> {
        self.inner.queries.fetch_add(1, Ordering::SeqCst);

        let latency = *lock(&self.inner.latency);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if query.table != self.inner.name {
            return Err(ContractError::query(
                &query.table,
                format!("relation '{}' does not exist", query.table),
            ));
        }
        if self.take_failure() {
            return Err(ContractError::query(&query.table, "injected failure"));
        }

        Ok(self.select(query))
    }
}

/// How a [`MemoryChannel`] answers a new registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelBehavior {
    /// Report `Subscribed` right away
    #[default]
    Confirm,
    /// Register, then report the given terminal status
    Reject(PushStatus),
    /// Register and never report anything
    Silent,
    /// Refuse the registration with an error
    Refuse,
}

/// In-memory realtime channel
#[derive(Clone)]
pub struct MemoryChannel {
    inner: Arc<ChannelInner>,
}

struct ChannelInner {
    behavior: Mutex<ChannelBehavior>,
    listeners: Mutex<HashMap<ListenerId, Listener>>,
    next_id: AtomicU64,
    listens: AtomicU64,
}

struct Listener {
    table: String,
    on_change: RowChangeCallback,
    on_status: PushStatusCallback,
}

impl MemoryChannel {
    fn new() -> Self {
        Self {
            inner: Arc::new(ChannelInner {
                behavior: Mutex::new(ChannelBehavior::default()),
                listeners: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                listens: AtomicU64::new(0),
            }),
        }
    }

    /// Behaviour applied to future `listen` calls
    pub fn set_behavior(&self, behavior: ChannelBehavior) {
        *lock(&self.inner.behavior) = behavior;
    }

    /// Number of open registrations
    pub fn listener_count(&self) -> usize {
        lock(&self.inner.listeners).len()
    }

    /// Number of `listen` calls ever made
    pub fn listen_count(&self) -> u64 {
        self.inner.listens.load(Ordering::SeqCst)
    }

    /// Send a status to every listener. Terminal statuses drop them.
    pub fn emit_status(&self, status: PushStatus) {
        let callbacks: Vec<PushStatusCallback> = {
            let mut listeners = lock(&self.inner.listeners);
            let callbacks = listeners.values().map(|l| Arc::clone(&l.on_status)).collect();
            if status.is_terminal() {
                listeners.clear();
            }
            callbacks
        };
        debug!(status = status.as_str(), listeners = callbacks.len(), "channel status emitted");
        for callback in callbacks {
            callback(status);
        }
    }

    fn publish(&self, change: RowChange) {
        // Callbacks run outside the lock so they may call back into the channel
        let callbacks: Vec<RowChangeCallback> = lock(&self.inner.listeners)
            .values()
            .filter(|l| l.table == change.table)
            .map(|l| Arc::clone(&l.on_change))
            .collect();
        for callback in callbacks {
            callback(change.clone());
        }
    }
}

impl RealtimeChannel for MemoryChannel {
    fn listen(
        &self,
        table: &str,
        on_change: RowChangeCallback,
        on_status: PushStatusCallback,
    ) -> Result<ListenerId, ContractError> {
        self.inner.listens.fetch_add(1, Ordering::SeqCst);
        let behavior = *lock(&self.inner.behavior);
        if behavior == ChannelBehavior::Refuse {
            return Err(ContractError::subscribe(table, "channel refused registration"));
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        lock(&self.inner.listeners).insert(
            id,
            Listener {
                table: table.to_string(),
                on_change,
                on_status: Arc::clone(&on_status),
            },
        );

        match behavior {
            ChannelBehavior::Confirm => on_status(PushStatus::Subscribed),
            ChannelBehavior::Reject(status) => {
                lock(&self.inner.listeners).remove(&id);
                on_status(status);
            }
            ChannelBehavior::Silent | ChannelBehavior::Refuse => {}
        }

        Ok(id)
    }

    fn close(&self, listener: ListenerId) {
        lock(&self.inner.listeners).remove(&listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex as StdMutex;

    #[test]
    fn test_upsert_then_update_kinds() {
        let table = MemoryTable::new("locations");
        let channel = table.channel();
        let kinds = Arc::new(StdMutex::new(Vec::new()));
        let k = Arc::clone(&kinds);

        channel
            .listen(
                "locations",
                Arc::new(move |change: RowChange| k.lock().unwrap().push(change.kind)),
                Arc::new(|_| {}),
            )
            .unwrap();

        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        table.upsert(Row::new(1u64, t0));
        table.upsert(Row::new(1u64, t0));
        assert!(table.delete("1"));
        assert!(!table.delete("1"));

        assert_eq!(
            *kinds.lock().unwrap(),
            vec![ChangeKind::Insert, ChangeKind::Update, ChangeKind::Delete]
        );
    }

    #[test]
    fn test_terminal_status_drops_listeners() {
        let table = MemoryTable::new("locations");
        let channel = table.channel();
        channel
            .listen("locations", Arc::new(|_| {}), Arc::new(|_| {}))
            .unwrap();
        assert_eq!(channel.listener_count(), 1);

        channel.emit_status(PushStatus::Closed);
        assert_eq!(channel.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_table_query_fails() {
        let table = MemoryTable::new("locations");
        let query = ProjectionQuery::latest_first("stores", vec![]);
        let err = table.fetch(&query).await.unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[tokio::test]
    async fn test_injected_failures_are_consumed() {
        let table = MemoryTable::new("locations");
        let query = ProjectionQuery::latest_first("locations", vec![]);
        table.fail_next_queries(2);

        assert!(table.fetch(&query).await.is_err());
        assert!(table.fetch(&query).await.is_err());
        assert!(table.fetch(&query).await.is_ok());
        assert_eq!(table.query_count(), 3);
    }
}
