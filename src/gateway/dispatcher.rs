use std::time::Duration;

use tokio::sync::broadcast;

use super::events::GatewayMessage;
use crate::error::GatewayError;
use crate::state::ConnectionState;

/// Capacity of the event channel; slow subscribers lag past this.
pub const EVENT_BUFFER: usize = 1024;

/// Everything the client reports to its consumers.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayEvent {
    Connected,
    Disconnected {
        code: u16,
        reason: String,
        message: String,
    },
    Reconnecting {
        attempt: u32,
        delay: Duration,
    },
    StateChange {
        state: ConnectionState,
    },
    /// Session established; carries the full READY payload.
    Ready {
        payload: serde_json::Value,
    },
    Resumed,
    Identifying,
    Resuming,
    HeartbeatTimeout,
    Error {
        error: GatewayError,
    },
    /// A server event, decoded but otherwise untouched.
    Dispatch {
        event_type: String,
        message: GatewayMessage,
    },
}

/// Fan-out of client events to any number of subscribers.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    tx: broadcast::Sender<GatewayEvent>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_BUFFER);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.tx.subscribe()
    }

    /// Deliver to current subscribers. Having none is not an error.
    pub fn emit(&self, event: GatewayEvent) {
        let _ = self.tx.send(event);
    }
}
