use crate::model::tick::Tick;

pub const CONNECTION_ERROR_NOTICE: &str =
    "WebSocket connection error. Real-time updates may be unavailable.";
pub const RECONNECTING_NOTICE: &str = "WebSocket connection closed. Attempting to reconnect...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// User-facing connection banner. `None` means nothing to show.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionNotice {
    #[default]
    None,
    Error(String),
    Retrying(String),
}

impl ConnectionNotice {
    pub fn error() -> Self {
        Self::Error(CONNECTION_ERROR_NOTICE.to_string())
    }

    pub fn retrying() -> Self {
        Self::Retrying(RECONNECTING_NOTICE.to_string())
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Error(msg) | Self::Retrying(msg) => Some(msg),
        }
    }

    pub fn is_visible(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Everything the relay connection reports to its consumers, in transport order.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    Tick(Tick),
    Status(ConnectionState),
    Notice(ConnectionNotice),
    Reconnecting { attempt: u32, delay_ms: u64 },
    /// A frame that did not decode as a tick. The connection stays open.
    Discarded { reason: String },
}
