//! ChangeEvent - Sync Engine output
//!
//! Transient notification handed to the consumer callback exactly once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{Row, RowChange};

/// What produced the notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    PushUpdate,
    PollUpdate,
    ManualRefresh,
}

/// Transport the notification came through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    Push,
    Poll,
    Manual,
}

impl EventSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::Poll => "poll",
            Self::Manual => "manual",
        }
    }
}

/// Event payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ChangePayload {
    /// Full projection from a poll whose fingerprint changed
    Snapshot(Vec<Row>),
    /// Single row change from the push channel
    Row(RowChange),
    /// Manual refresh carries no data
    None,
}

/// Update notification delivered to consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub event_type: EventType,
    pub source: EventSource,
    pub timestamp: DateTime<Utc>,
    pub payload: ChangePayload,
}

impl ChangeEvent {
    /// Poll result with a new fingerprint
    pub fn poll(timestamp: DateTime<Utc>, rows: Vec<Row>) -> Self {
        Self {
            event_type: EventType::PollUpdate,
            source: EventSource::Poll,
            timestamp,
            payload: ChangePayload::Snapshot(rows),
        }
    }

    /// Row change from the push channel
    pub fn push(timestamp: DateTime<Utc>, change: RowChange) -> Self {
        Self {
            event_type: EventType::PushUpdate,
            source: EventSource::Push,
            timestamp,
            payload: ChangePayload::Row(change),
        }
    }

    /// Consumer-triggered refresh
    pub fn manual(timestamp: DateTime<Utc>) -> Self {
        Self {
            event_type: EventType::ManualRefresh,
            source: EventSource::Manual,
            timestamp,
            payload: ChangePayload::None,
        }
    }
}

/// Consumer callback type
///
/// Registered once when the engine is built. Invoked from engine tasks, so it
/// must be cheap and must not block.
pub type UpdateCallback = Arc<dyn Fn(ChangeEvent) + Send + Sync>;
