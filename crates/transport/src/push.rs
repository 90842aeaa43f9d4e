//! Push transport
//!
//! Thin adapter over a vendor [`RealtimeChannel`]. Adds idempotent teardown
//! and drops anything the vendor delivers after teardown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use contracts::{ListenerId, PushStatusCallback, RealtimeChannel, RowChangeCallback};
use tracing::{debug, warn};

use crate::error::{Result, TransportError};

/// Push-based transport over one realtime channel
#[derive(Clone)]
pub struct PushTransport {
    channel: Arc<dyn RealtimeChannel>,
}

impl PushTransport {
    pub fn new(channel: Arc<dyn RealtimeChannel>) -> Self {
        Self { channel }
    }

    /// Subscribe to row changes on `table`.
    ///
    /// `on_event` only sees changes for `table`. Both callbacks go quiet as
    /// soon as the returned subscription is torn down.
    ///
    /// # Errors
    /// `TransportError::Subscribe` when the channel refuses the registration
    pub fn subscribe(
        &self,
        table: &str,
        on_event: RowChangeCallback,
        on_status: PushStatusCallback,
    ) -> Result<Subscription> {
        // Raised before `listen`: channels may confirm synchronously
        let active = Arc::new(AtomicBool::new(true));

        let event_gate = Arc::clone(&active);
        let wanted = table.to_string();
        let gated_event: RowChangeCallback = Arc::new(move |change| {
            if event_gate.load(Ordering::SeqCst) && change.table == wanted {
                on_event(change);
            }
        });

        let status_gate = Arc::clone(&active);
        let gated_status: PushStatusCallback = Arc::new(move |status| {
            if status_gate.load(Ordering::SeqCst) {
                on_status(status);
            }
        });

        match self.channel.listen(table, gated_event, gated_status) {
            Ok(listener) => {
                debug!(table = %table, listener, "push subscription opened");
                Ok(Subscription {
                    channel: Arc::clone(&self.channel),
                    listener,
                    table: table.to_string(),
                    active,
                })
            }
            Err(e) => {
                active.store(false, Ordering::SeqCst);
                warn!(table = %table, error = %e, "push subscription refused");
                Err(TransportError::subscribe(table, e.to_string()))
            }
        }
    }
}

/// Live registration on a realtime channel
///
/// Unsubscribes on drop.
pub struct Subscription {
    channel: Arc<dyn RealtimeChannel>,
    listener: ListenerId,
    table: String,
    active: Arc<AtomicBool>,
}

impl Subscription {
    /// Tear the subscription down. Safe to call any number of times.
    pub fn unsubscribe(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            self.channel.close(self.listener);
            debug!(table = %self.table, listener = self.listener, "push subscription closed");
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
