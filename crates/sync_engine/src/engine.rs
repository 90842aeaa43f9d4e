//! Main sync engine implementation.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use contracts::{
    ChangeEvent, ConnectionStatus, ConnectionType, DatasetFingerprint, PushStatus,
    PushStatusCallback, RowChange, RowChangeCallback, RowQuery, SyncConfig, UpdateCallback,
};
use tokio::sync::{mpsc, watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use transport::{PollOutcome, PollTransport, PushTransport, Subscription, TransportError};

use crate::clock::WallClock;
use crate::phase::EnginePhase;
use crate::stats::{EngineStats, StatsSnapshot};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Result of a manual refresh request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Event emitted and poll loop woken
    Applied,
    /// Inside the debounce window; nothing happened
    Rejected { retry_after: Duration },
}

impl RefreshOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Signals forwarded from the vendor callbacks into the push task
enum PushSignal {
    Change(RowChange),
    Status(PushStatus),
}

/// Mutable engine state, only touched under the core lock
#[derive(Default)]
struct Core {
    phase: EnginePhase,
    /// Bumped whenever poll results in flight must be discarded
    poll_gen: u64,
    /// Bumped whenever push signals in flight must be discarded
    push_gen: u64,
    /// Set by a push failure; only `retry()` clears it
    push_failed: bool,
    fingerprint: Option<DatasetFingerprint>,
    consecutive_failures: u32,
    last_manual_refresh: Option<Instant>,
    poll_task: Option<JoinHandle<()>>,
    push_task: Option<JoinHandle<()>>,
    subscription: Option<Subscription>,
}

pub(crate) struct Shared<Q> {
    name: String,
    config: SyncConfig,
    poll: PollTransport<Q>,
    push: Option<PushTransport>,
    on_update: UpdateCallback,
    status_tx: watch::Sender<ConnectionStatus>,
    clock: WallClock,
    wake: Notify,
    stats: EngineStats,
    core: Mutex<Core>,
}

/// Per-consumer synchronization engine
///
/// Keeps one consumer fresh against one table. Prefers the push transport,
/// falls back to polling for the rest of the session when push fails, and
/// guarantees that nothing is delivered after [`SyncEngine::stop`].
///
/// Every method is synchronous, but `start`, `retry` and `force_refresh`
/// spawn or wake Tokio tasks and must run inside a Tokio runtime. Errors
/// never escape; they show up in [`SyncEngine::status`].
///
/// Dropping the engine stops it.
pub struct SyncEngine<Q: RowQuery + Sync + 'static> {
    shared: Arc<Shared<Q>>,
}

impl<Q: RowQuery + Sync + 'static> SyncEngine<Q> {
    pub(crate) fn from_parts(
        name: String,
        config: SyncConfig,
        poll: PollTransport<Q>,
        push: Option<PushTransport>,
        on_update: UpdateCallback,
    ) -> Self {
        let (status_tx, _) = watch::channel(ConnectionStatus::default());
        Self {
            shared: Arc::new(Shared {
                name,
                config,
                poll,
                push,
                on_update,
                status_tx,
                clock: WallClock::new(),
                wake: Notify::new(),
                stats: EngineStats::new(),
                core: Mutex::new(Core::default()),
            }),
        }
    }

    /// Begin synchronizing. No-op unless idle.
    pub fn start(&self) {
        self.shared.start();
    }

    /// Stop all background work.
    ///
    /// Synchronous: when this returns, no task is scheduled, the push
    /// subscription is closed and results still in flight are discarded.
    pub fn stop(&self) {
        self.shared.stop();
    }

    /// Ask for fresh data now, subject to the debounce window.
    pub fn force_refresh(&self) -> RefreshOutcome {
        self.shared.force_refresh()
    }

    /// Clear the push failure latch and try again from scratch.
    pub fn retry(&self) {
        self.shared.retry();
    }

    /// Copy of the current status
    pub fn status(&self) -> ConnectionStatus {
        self.shared.status_tx.borrow().clone()
    }

    /// Status change notifications
    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.shared.status_tx.subscribe()
    }

    pub fn phase(&self) -> EnginePhase {
        lock(&self.shared.core).phase
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn config(&self) -> &SyncConfig {
        &self.shared.config
    }

    pub fn table(&self) -> &str {
        self.shared.poll.table()
    }

    /// Whether this instance may use the push transport at all
    pub fn push_available(&self) -> bool {
        self.shared.push_available()
    }
}

impl<Q: RowQuery + Sync + 'static> Drop for SyncEngine<Q> {
    fn drop(&mut self) {
        self.shared.stop();
    }
}

impl<Q: RowQuery + Sync + 'static> Shared<Q> {
    fn push_available(&self) -> bool {
        self.config.push_allowed() && self.push.is_some()
    }

    fn start(self: &Arc<Self>) {
        let mut core = lock(&self.core);
        if core.phase != EnginePhase::Idle {
            debug!(engine = %self.name, phase = %core.phase, "start ignored");
            return;
        }

        info!(
            engine = %self.name,
            table = %self.poll.table(),
            push_available = self.push_available(),
            push_failed = core.push_failed,
            "sync engine starting"
        );

        if self.push_available() && !core.push_failed {
            self.begin_push(&mut core);
        } else {
            self.begin_polling(&mut core);
        }
    }

    fn stop(&self) {
        let mut core = lock(&self.core);
        core.poll_gen += 1;
        core.push_gen += 1;

        if let Some(task) = core.poll_task.take() {
            task.abort();
        }
        if let Some(task) = core.push_task.take() {
            task.abort();
        }
        if let Some(subscription) = core.subscription.take() {
            subscription.unsubscribe();
        }

        core.fingerprint = None;
        core.consecutive_failures = 0;

        if core.phase != EnginePhase::Idle {
            self.transition(&mut core, EnginePhase::Idle);
            info!(engine = %self.name, "sync engine stopped");
        }

        self.status_tx.send_modify(|s| {
            s.is_connected = false;
            s.connection_type = ConnectionType::Disabled;
            s.is_polling = false;
            s.error = None;
            s.retry_count = 0;
        });
    }

    fn force_refresh(&self) -> RefreshOutcome {
        let now = Instant::now();
        let timestamp = {
            let mut core = lock(&self.core);
            if let Some(last) = core.last_manual_refresh {
                let elapsed = now.duration_since(last);
                if elapsed < self.config.debounce_window {
                    let retry_after = self.config.debounce_window - elapsed;
                    self.stats.inc_refresh_rejected();
                    observability::record_refresh_rejected(&self.name);
                    debug!(
                        engine = %self.name,
                        retry_after_ms = retry_after.as_millis() as u64,
                        "manual refresh debounced"
                    );
                    return RefreshOutcome::Rejected { retry_after };
                }
            }

            core.last_manual_refresh = Some(now);
            let timestamp = self.clock.now();
            self.status_tx
                .send_modify(|s| s.last_update = Some(timestamp));
            timestamp
        };

        debug!(engine = %self.name, "manual refresh applied");
        self.wake.notify_waiters();
        self.emit(ChangeEvent::manual(timestamp));
        RefreshOutcome::Applied
    }

    fn retry(self: &Arc<Self>) {
        let mut core = lock(&self.core);
        if core.phase.is_push() {
            debug!(engine = %self.name, phase = %core.phase, "retry ignored");
            return;
        }

        info!(engine = %self.name, phase = %core.phase, "retry requested");
        core.push_failed = false;
        core.consecutive_failures = 0;
        self.status_tx.send_modify(|s| s.retry_count = 0);

        if self.push_available() {
            // Any running poll loop stays up until the subscription confirms
            self.begin_push(&mut core);
        } else if core.poll_task.is_some() {
            if core.phase == EnginePhase::Failed {
                self.transition(&mut core, EnginePhase::PollingActive);
            }
            drop(core);
            self.wake.notify_waiters();
        } else {
            self.begin_polling(&mut core);
        }
    }

    // ===== Push transport =====

    fn begin_push(self: &Arc<Self>, core: &mut Core) {
        let Some(push) = self.push.as_ref() else {
            self.begin_polling(core);
            return;
        };

        core.push_gen += 1;
        let gen = core.push_gen;
        if let Some(task) = core.push_task.take() {
            task.abort();
        }
        if let Some(subscription) = core.subscription.take() {
            subscription.unsubscribe();
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let change_tx = tx.clone();
        let on_event: RowChangeCallback = Arc::new(move |change| {
            let _ = change_tx.send(PushSignal::Change(change));
        });
        let on_status: PushStatusCallback = Arc::new(move |status| {
            let _ = tx.send(PushSignal::Status(status));
        });

        match push.subscribe(self.poll.table(), on_event, on_status) {
            Ok(subscription) => {
                core.subscription = Some(subscription);
                self.transition(core, EnginePhase::WebSocketConnecting);

                if core.poll_task.is_none() {
                    self.status_tx.send_modify(|s| {
                        s.is_connected = false;
                        s.connection_type = ConnectionType::WebSocket;
                        s.is_polling = false;
                    });
                }

                let shared = Arc::clone(self);
                core.push_task = Some(tokio::spawn(async move {
                    shared.push_loop(gen, rx).await;
                }));
            }
            Err(e) => self.fall_back(core, "subscribe_refused", e.to_string()),
        }
    }

    #[instrument(name = "sync_engine_push_loop", skip(self, rx), fields(engine = %self.name))]
    async fn push_loop(self: Arc<Self>, gen: u64, mut rx: mpsc::UnboundedReceiver<PushSignal>) {
        let deadline = tokio::time::sleep(self.config.heartbeat_interval);
        tokio::pin!(deadline);
        let mut confirmed = false;

        loop {
            let signal = tokio::select! {
                signal = rx.recv() => signal,
                _ = &mut deadline, if !confirmed => {
                    self.on_push_failure(gen, "timeout", "push subscription not confirmed in time");
                    return;
                }
            };

            match signal {
                Some(PushSignal::Status(PushStatus::Subscribed)) => {
                    if !confirmed {
                        confirmed = true;
                        self.on_subscribed(gen);
                    }
                }
                Some(PushSignal::Status(status)) => {
                    self.on_push_failure(
                        gen,
                        status.as_str(),
                        format!("push channel reported {}", status.as_str()),
                    );
                    return;
                }
                Some(PushSignal::Change(change)) => self.on_push_change(gen, change),
                None => {
                    self.on_push_failure(gen, "channel_closed", "push channel closed");
                    return;
                }
            }
        }
    }

    fn on_subscribed(&self, gen: u64) {
        let mut core = lock(&self.core);
        if core.push_gen != gen || core.phase != EnginePhase::WebSocketConnecting {
            return;
        }

        if let Some(task) = core.poll_task.take() {
            task.abort();
            debug!(engine = %self.name, "poll loop cancelled by push confirmation");
        }
        core.poll_gen += 1;
        core.consecutive_failures = 0;
        self.transition(&mut core, EnginePhase::WebSocketConnected);

        self.status_tx.send_modify(|s| {
            s.is_connected = true;
            s.connection_type = ConnectionType::WebSocket;
            s.is_polling = false;
            s.error = None;
            s.retry_count = 0;
        });
    }

    fn on_push_change(&self, gen: u64, change: RowChange) {
        let timestamp = {
            let mut core = lock(&self.core);
            if core.push_gen != gen || !core.phase.is_push() {
                return;
            }
            // Next poll must not treat its snapshot as already seen
            core.fingerprint = None;
            let timestamp = self.clock.now();
            self.status_tx
                .send_modify(|s| s.last_update = Some(timestamp));
            timestamp
        };

        debug!(
            engine = %self.name,
            id = %change.row.id,
            kind = ?change.kind,
            "push change received"
        );
        self.emit(ChangeEvent::push(timestamp, change));
    }

    fn on_push_failure(self: &Arc<Self>, gen: u64, reason: &str, message: impl Into<String>) {
        let mut core = lock(&self.core);
        if core.push_gen != gen {
            return;
        }
        // The calling task is about to return
        core.push_task.take();
        self.fall_back(&mut core, reason, message.into());
    }

    /// Permanent switch to polling for this session
    fn fall_back(self: &Arc<Self>, core: &mut Core, reason: &str, message: String) {
        core.push_gen += 1;
        core.push_failed = true;
        if let Some(subscription) = core.subscription.take() {
            subscription.unsubscribe();
        }

        self.stats.inc_push_fallbacks();
        observability::record_push_fallback(&self.name, reason);
        warn!(engine = %self.name, reason, error = %message, "push transport failed, falling back to polling");

        self.status_tx.send_modify(|s| {
            s.error = Some(message);
            s.retry_count += 1;
        });

        if core.poll_task.is_some() {
            let next = if core.consecutive_failures >= self.config.max_retries {
                EnginePhase::Failed
            } else {
                EnginePhase::PollingActive
            };
            self.transition(core, next);
        } else {
            self.begin_polling(core);
        }
    }

    // ===== Poll transport =====

    fn begin_polling(self: &Arc<Self>, core: &mut Core) {
        core.poll_gen += 1;
        let gen = core.poll_gen;
        if let Some(task) = core.poll_task.take() {
            task.abort();
        }

        self.transition(core, EnginePhase::PollingActive);
        self.status_tx.send_modify(|s| {
            s.connection_type = ConnectionType::Polling;
            s.is_polling = true;
        });

        let shared = Arc::clone(self);
        core.poll_task = Some(tokio::spawn(async move {
            shared.poll_loop(gen).await;
        }));
    }

    #[instrument(name = "sync_engine_poll_loop", skip(self), fields(engine = %self.name))]
    async fn poll_loop(self: Arc<Self>, gen: u64) {
        loop {
            // Registered before the query so a refresh landing mid-poll is kept
            let wake = self.wake.notified();
            tokio::pin!(wake);

            let started = Instant::now();
            let result = self.poll.poll().await;
            let Some(delay) = self.apply_poll(gen, result, started.elapsed()) else {
                debug!("poll loop superseded");
                return;
            };

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = &mut wake => {
                    debug!("poll loop woken early");
                }
            }
        }
    }

    /// Fold one poll result into the engine. Returns the delay before the
    /// next poll, or `None` when the loop is stale.
    fn apply_poll(
        &self,
        gen: u64,
        result: Result<PollOutcome, TransportError>,
        latency: Duration,
    ) -> Option<Duration> {
        let latency_ms = latency.as_secs_f64() * 1000.0;
        let mut event = None;

        let delay = {
            let mut core = lock(&self.core);
            if core.poll_gen != gen {
                return None;
            }

            match result {
                Ok(PollOutcome { rows, fingerprint }) => {
                    self.stats.inc_polls_ok();
                    observability::record_poll(&self.name, true, latency_ms);

                    core.consecutive_failures = 0;
                    if core.phase == EnginePhase::Failed {
                        info!(engine = %self.name, "poll recovered");
                        self.transition(&mut core, EnginePhase::PollingActive);
                    }

                    let changed = core.fingerprint != Some(fingerprint);
                    core.fingerprint = Some(fingerprint);
                    let timestamp = changed.then(|| self.clock.now());

                    self.status_tx.send_modify(|s| {
                        s.is_connected = true;
                        s.connection_type = ConnectionType::Polling;
                        s.is_polling = true;
                        s.error = None;
                        if let Some(timestamp) = timestamp {
                            s.last_update = Some(timestamp);
                        }
                    });

                    if let Some(timestamp) = timestamp {
                        debug!(engine = %self.name, rows = rows.len(), %fingerprint, "dataset changed");
                        event = Some(ChangeEvent::poll(timestamp, rows));
                    }
                    self.config.polling_interval
                }
                Err(e) => {
                    self.stats.inc_polls_failed();
                    observability::record_poll(&self.name, false, latency_ms);

                    core.consecutive_failures += 1;
                    let failures = core.consecutive_failures;
                    let exhausted = failures >= self.config.max_retries;
                    warn!(engine = %self.name, failures, error = %e, "poll failed");

                    if exhausted && core.phase == EnginePhase::PollingActive {
                        error!(engine = %self.name, failures, "poll retries exhausted");
                        self.transition(&mut core, EnginePhase::Failed);
                    }

                    self.status_tx.send_modify(|s| {
                        s.error = Some(e.to_string());
                        s.retry_count += 1;
                        if exhausted {
                            s.is_connected = false;
                        }
                    });
                    self.config.failure_backoff(failures)
                }
            }
        };

        if let Some(event) = event {
            self.emit(event);
        }
        Some(delay)
    }

    // ===== Shared helpers =====

    fn transition(&self, core: &mut Core, next: EnginePhase) {
        if core.phase == next {
            return;
        }
        info!(engine = %self.name, from = %core.phase, to = %next, "phase transition");
        core.phase = next;

        let connection_type = match next {
            EnginePhase::WebSocketConnecting | EnginePhase::WebSocketConnected => "websocket",
            EnginePhase::PollingActive | EnginePhase::Failed => "polling",
            EnginePhase::Idle => "disabled",
        };
        observability::record_connection(
            &self.name,
            matches!(next, EnginePhase::WebSocketConnected | EnginePhase::PollingActive),
            connection_type,
        );
    }

    /// Hand an event to the consumer. Never called under the core lock.
    fn emit(&self, event: ChangeEvent) {
        self.stats.inc_events_emitted();
        observability::record_change_event(&self.name, event.source.as_str());
        (self.on_update)(event);
    }
}
