use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::Serialize;

use crate::gateway::session::SessionInfo;
use crate::rate_limit::RateLimiter;
use crate::stats::ConnectionStats;

/// Lifecycle state of the gateway connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    /// Terminal until the next explicit `connect()`.
    Failed,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Failed => "failed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the read-side queries need, copied out of the actor after each
/// message it handles.
#[derive(Debug, Clone)]
pub struct ClientSnapshot {
    pub state: ConnectionState,
    pub session: SessionInfo,
    pub stats: ConnectionStats,
    pub rate_limits: RateLimiter,
}

/// Lock-free handle to the latest [`ClientSnapshot`].
pub type SharedSnapshot = Arc<ArcSwap<ClientSnapshot>>;

pub fn shared(snapshot: ClientSnapshot) -> SharedSnapshot {
    Arc::new(ArcSwap::from_pointee(snapshot))
}
