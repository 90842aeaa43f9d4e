//! ConnectionStatus - Sync Engine observable state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Transport currently feeding a consumer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    /// Realtime push channel
    WebSocket,
    /// Periodic pull
    Polling,
    /// No transport (idle or stopped)
    #[default]
    Disabled,
}

/// Engine state as seen by consumers.
///
/// Owned by the engine; consumers only ever get copies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub is_connected: bool,
    pub connection_type: ConnectionType,
    /// When the consumer was last told about fresh data
    pub last_update: Option<DateTime<Utc>>,
    /// Most recent transport or query error
    pub error: Option<String>,
    pub retry_count: u32,
    pub is_polling: bool,
}

/// The three user-visible connection states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionHealth {
    /// Connected through the push channel
    Live,
    /// Connected through polling
    Degraded,
    /// Not connected; the UI should offer a retry
    Disconnected,
}

impl ConnectionStatus {
    /// Collapse the status into one of the three rendered states.
    pub fn health(&self) -> ConnectionHealth {
        match (self.is_connected, self.connection_type) {
            (true, ConnectionType::WebSocket) => ConnectionHealth::Live,
            (true, ConnectionType::Polling) => ConnectionHealth::Degraded,
            _ => ConnectionHealth::Disconnected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_disconnected() {
        let status = ConnectionStatus::default();
        assert_eq!(status.connection_type, ConnectionType::Disabled);
        assert_eq!(status.health(), ConnectionHealth::Disconnected);
    }

    #[test]
    fn test_health_mapping() {
        let mut status = ConnectionStatus {
            is_connected: true,
            connection_type: ConnectionType::WebSocket,
            ..Default::default()
        };
        assert_eq!(status.health(), ConnectionHealth::Live);

        status.connection_type = ConnectionType::Polling;
        assert_eq!(status.health(), ConnectionHealth::Degraded);

        // An error alone does not flip a connected consumer
        status.error = Some("timeout".into());
        assert_eq!(status.health(), ConnectionHealth::Degraded);

        status.is_connected = false;
        assert_eq!(status.health(), ConnectionHealth::Disconnected);
    }
}
