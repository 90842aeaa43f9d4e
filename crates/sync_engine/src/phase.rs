//! Engine phases

use std::fmt;

/// Lifecycle phase of one engine instance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum EnginePhase {
    /// Not started, or stopped
    #[default]
    Idle,
    /// Push subscription requested, waiting for confirmation
    WebSocketConnecting,
    /// Push subscription confirmed
    WebSocketConnected,
    /// Periodic polling
    PollingActive,
    /// Polling, but the last `max_retries` polls all failed
    Failed,
}

impl EnginePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::WebSocketConnecting => "websocket_connecting",
            Self::WebSocketConnected => "websocket_connected",
            Self::PollingActive => "polling_active",
            Self::Failed => "failed",
        }
    }

    /// Whether the push transport owns this phase
    pub fn is_push(&self) -> bool {
        matches!(self, Self::WebSocketConnecting | Self::WebSocketConnected)
    }
}

impl fmt::Display for EnginePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
