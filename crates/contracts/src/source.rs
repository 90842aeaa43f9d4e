//! Store seams - pull queries and realtime channels
//!
//! Decouples the transports from any concrete vendor client. Real adapters and
//! the in-memory store implement the same traits.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{ContractError, Row, RowChange};

/// Ordering clause of a projection query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub column: String,
    pub descending: bool,
}

/// Read-only projection against one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionQuery {
    pub table: String,
    /// Extra columns on top of `id`, `updated_at`, `name`
    pub columns: Vec<String>,
    pub order_by: OrderBy,
}

impl ProjectionQuery {
    /// Lightweight projection ordered by `updated_at` descending
    pub fn latest_first(table: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            table: table.into(),
            columns,
            order_by: OrderBy {
                column: "updated_at".to_string(),
                descending: true,
            },
        }
    }
}

/// Pull side of the backing store
#[trait_variant::make(RowQuery: Send)]
pub trait LocalRowQuery {
    /// Run the projection and return every matching row in the requested order.
    ///
    /// # Errors
    /// Network or backend failure (should include context)
    async fn fetch(&self, query: &ProjectionQuery) -> Result<Vec<Row>, ContractError>;
}

/// Lifecycle signal of a realtime subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PushStatus {
    Subscribed,
    ChannelError,
    TimedOut,
    Closed,
}

impl PushStatus {
    /// Whether the signal ends the subscription
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Subscribed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Subscribed => "subscribed",
            Self::ChannelError => "channel_error",
            Self::TimedOut => "timed_out",
            Self::Closed => "closed",
        }
    }
}

/// Row change callback type
pub type RowChangeCallback = Arc<dyn Fn(RowChange) + Send + Sync>;

/// Subscription status callback type
pub type PushStatusCallback = Arc<dyn Fn(PushStatus) + Send + Sync>;

/// Handle identifying one `listen` registration on a channel
pub type ListenerId = u64;

/// Vendor realtime channel
///
/// Callback based, matching how hosted realtime clients deliver frames. The
/// channel may invoke the callbacks from any thread, including synchronously
/// from inside `listen`.
pub trait RealtimeChannel: Send + Sync {
    /// Start receiving row changes for `table`
    ///
    /// # Errors
    /// The channel refused the registration outright
    fn listen(
        &self,
        table: &str,
        on_change: RowChangeCallback,
        on_status: PushStatusCallback,
    ) -> Result<ListenerId, ContractError>;

    /// Drop a registration. Unknown ids are ignored.
    fn close(&self, listener: ListenerId);
}
