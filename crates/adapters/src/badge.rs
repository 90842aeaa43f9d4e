//! Connection badge rendered by consumers

use std::fmt;

use serde::Serialize;

use contracts::{ConnectionHealth, ConnectionStatus, ConnectionType};

/// The three user-visible connection states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionBadge {
    /// Realtime updates
    Live,
    /// Periodic refresh
    Polling,
    /// Not connected. `can_retry` is false while a push attempt is pending.
    Offline { can_retry: bool },
}

impl ConnectionBadge {
    pub fn from_status(status: &ConnectionStatus) -> Self {
        match status.health() {
            ConnectionHealth::Live => Self::Live,
            ConnectionHealth::Degraded => Self::Polling,
            ConnectionHealth::Disconnected => Self::Offline {
                can_retry: status.connection_type != ConnectionType::WebSocket,
            },
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Polling => "polling",
            Self::Offline { .. } => "offline",
        }
    }
}

impl fmt::Display for ConnectionBadge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(is_connected: bool, connection_type: ConnectionType) -> ConnectionStatus {
        ConnectionStatus {
            is_connected,
            connection_type,
            ..Default::default()
        }
    }

    #[test]
    fn test_badges_are_distinct() {
        assert_eq!(
            ConnectionBadge::from_status(&status(true, ConnectionType::WebSocket)),
            ConnectionBadge::Live
        );
        assert_eq!(
            ConnectionBadge::from_status(&status(true, ConnectionType::Polling)),
            ConnectionBadge::Polling
        );
        assert_eq!(
            ConnectionBadge::from_status(&status(false, ConnectionType::Polling)),
            ConnectionBadge::Offline { can_retry: true }
        );
    }

    #[test]
    fn test_pending_push_cannot_retry() {
        assert_eq!(
            ConnectionBadge::from_status(&status(false, ConnectionType::WebSocket)),
            ConnectionBadge::Offline { can_retry: false }
        );
    }

    #[test]
    fn test_serialize() {
        let json = serde_json::to_value(ConnectionBadge::Offline { can_retry: true }).unwrap();
        assert_eq!(json["state"], "offline");
        assert_eq!(json["can_retry"], true);
    }
}
